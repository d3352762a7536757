//! Access token database operations

use chrono::{DateTime, Utc};
use soundwave_common::db::models::AuthToken;
use soundwave_common::time::{parse_storage, storage_format};
use soundwave_common::Result;
use sqlx::{Row, SqlitePool};

/// Persist a freshly minted token
pub async fn store_token(pool: &SqlitePool, token: &AuthToken) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(storage_format(token.expires_at))
    .bind(storage_format(token.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a stored token
pub async fn find_token(pool: &SqlitePool, token: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        "SELECT token, user_id, expires_at, created_at FROM auth_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let expires_at: String = row.get("expires_at");
            let created_at: String = row.get("created_at");
            Ok(Some(AuthToken {
                token: row.get("token"),
                user_id: row.get("user_id"),
                expires_at: parse_storage(&expires_at)?,
                created_at: parse_storage(&created_at)?,
            }))
        }
        None => Ok(None),
    }
}

/// Remove tokens whose expiry is at or before `now`, returning the count
pub async fn delete_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= ?")
        .bind(storage_format(now))
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
