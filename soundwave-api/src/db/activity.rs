//! Activity logging for playlist events
//!
//! Events recorded here feed recommendation training downstream. Failures
//! are logged and swallowed so they never fail the user-facing operation.

use soundwave_common::time::{storage_format, utc_now};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

/// Record a playlist event
pub async fn log_activity(
    pool: &SqlitePool,
    user_id: &str,
    playlist_id: &str,
    action: &str,
    details: Option<serde_json::Value>,
) {
    let details = details.unwrap_or_else(|| serde_json::json!({}));

    let result = sqlx::query(
        r#"
        INSERT INTO activities (guid, user_id, playlist_id, action, details, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(playlist_id)
    .bind(action)
    .bind(details.to_string())
    .bind(storage_format(utc_now()))
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(
            "Failed to record '{}' activity for playlist {}: {}",
            action, playlist_id, e
        );
    }
}
