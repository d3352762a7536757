//! User and preference database operations

use chrono::{DateTime, Utc};
use soundwave_common::db::models::{User, UserPreferences};
use soundwave_common::time::{parse_storage, storage_format};
use soundwave_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Persist a new user record
pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (guid, email, password_hash, password_salt, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.guid)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(storage_format(user.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.get("created_at");
    Ok(User {
        guid: row.get("guid"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        created_at: parse_storage(&created_at)?,
    })
}

/// Look up a user by (lowercased) email
pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT guid, email, password_hash, password_salt, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|r| user_from_row(&r)).transpose()
}

/// Look up a user by id
pub async fn find_user_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT guid, email, password_hash, password_salt, created_at FROM users WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    row.map(|r| user_from_row(&r)).transpose()
}

/// Fetch stored preferences, defaulting to an empty profile
pub async fn get_preferences(pool: &SqlitePool, user_id: &str) -> Result<UserPreferences> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT genres, artists FROM user_preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((genres, artists)) => Ok(UserPreferences {
            genres: serde_json::from_str(&genres).unwrap_or_default(),
            artists: serde_json::from_str(&artists).unwrap_or_default(),
        }),
        None => Ok(UserPreferences::default()),
    }
}

/// Insert or replace a user's preference profile
pub async fn upsert_preferences(
    pool: &SqlitePool,
    user_id: &str,
    preferences: &UserPreferences,
    now: DateTime<Utc>,
) -> Result<()> {
    let stored_now = storage_format(now);
    sqlx::query(
        r#"
        INSERT INTO user_preferences (user_id, genres, artists, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            genres = excluded.genres,
            artists = excluded.artists,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(serde_json::to_string(&preferences.genres)?)
    .bind(serde_json::to_string(&preferences.artists)?)
    .bind(&stored_now)
    .bind(&stored_now)
    .execute(pool)
    .await?;

    Ok(())
}
