//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to
//! date. All statements are idempotent, so the full set runs on every
//! startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize the database connection pool and create tables if needed
///
/// Foreign keys are enabled per connection via connect options so every
/// pooled connection enforces them. WAL allows concurrent readers with one
/// writer.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
///
/// Exposed separately so tests can apply the schema to in-memory databases.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_user_preferences_table(pool).await?;
    create_auth_tokens_table(pool).await?;
    create_playlists_table(pool).await?;
    create_playlist_items_table(pool).await?;
    create_activities_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            CHECK (length(email) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_preferences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id TEXT PRIMARY KEY REFERENCES users(guid) ON DELETE CASCADE,
            genres TEXT NOT NULL DEFAULT '[]',
            artists TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_auth_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            expires_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the playlists table
///
/// `allowed_users` holds a JSON array of user ids granted shared access.
async fn create_playlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            guid TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            slug TEXT NOT NULL UNIQUE,
            is_public INTEGER NOT NULL DEFAULT 0,
            allowed_users TEXT NOT NULL DEFAULT '[]',
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            CHECK (length(name) > 0 AND length(name) <= 200),
            CHECK (description IS NULL OR length(description) <= 2000)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the playlist_items table
///
/// Positions are kept contiguous from 0 by the mutation paths; the index
/// on (playlist_id, position) serves ordered item reads.
async fn create_playlist_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_items (
            guid TEXT PRIMARY KEY,
            playlist_id TEXT NOT NULL REFERENCES playlists(guid) ON DELETE CASCADE,
            item_type TEXT NOT NULL CHECK (item_type IN ('movie', 'music')),
            media_id TEXT NOT NULL CHECK (length(media_id) > 0),
            metadata TEXT,
            position INTEGER NOT NULL CHECK (position >= 0),
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_playlist_items_position ON playlist_items(playlist_id, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the activities table
///
/// Playlist events recorded here feed recommendation training downstream.
async fn create_activities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            playlist_id TEXT NOT NULL,
            action TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_playlist ON activities(playlist_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
