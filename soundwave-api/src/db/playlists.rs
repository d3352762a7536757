//! Playlist and playlist item database operations

use soundwave_common::db::models::{Playlist, PlaylistItem, PlaylistItemType};
use soundwave_common::time::{parse_storage, storage_format};
use soundwave_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const PLAYLIST_COLUMNS: &str =
    "guid, owner_id, name, description, slug, is_public, allowed_users, created_at, updated_at";

fn playlist_from_row(row: &SqliteRow) -> Result<Playlist> {
    let allowed_users: String = row.get("allowed_users");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Playlist {
        guid: row.get("guid"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_public: row.get::<i64, _>("is_public") != 0,
        allowed_users: serde_json::from_str(&allowed_users)?,
        created_at: parse_storage(&created_at)?,
        updated_at: parse_storage(&updated_at)?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<PlaylistItem> {
    let item_type: String = row.get("item_type");
    let metadata: Option<String> = row.get("metadata");
    let created_at: String = row.get("created_at");

    Ok(PlaylistItem {
        guid: row.get("guid"),
        playlist_id: row.get("playlist_id"),
        item_type: PlaylistItemType::parse(&item_type)
            .ok_or_else(|| Error::Internal(format!("invalid stored item type '{}'", item_type)))?,
        media_id: row.get("media_id"),
        metadata: metadata.map(|m| serde_json::from_str(&m)).transpose()?,
        position: row.get("position"),
        created_at: parse_storage(&created_at)?,
    })
}

/// Persist a new playlist
pub async fn insert_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlists (guid, owner_id, name, description, slug, is_public, allowed_users, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&playlist.guid)
    .bind(&playlist.owner_id)
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(&playlist.slug)
    .bind(playlist.is_public as i64)
    .bind(serde_json::to_string(&playlist.allowed_users)?)
    .bind(storage_format(playlist.created_at))
    .bind(storage_format(playlist.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back mutable playlist fields by id
pub async fn update_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE playlists
        SET name = ?, description = ?, slug = ?, is_public = ?, allowed_users = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&playlist.name)
    .bind(&playlist.description)
    .bind(&playlist.slug)
    .bind(playlist.is_public as i64)
    .bind(serde_json::to_string(&playlist.allowed_users)?)
    .bind(storage_format(playlist.updated_at))
    .bind(&playlist.guid)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a playlist and its items
pub async fn delete_playlist(pool: &SqlitePool, guid: &str) -> Result<()> {
    sqlx::query("DELETE FROM playlist_items WHERE playlist_id = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM playlists WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Fetch a playlist by id
pub async fn fetch_playlist(pool: &SqlitePool, guid: &str) -> Result<Option<Playlist>> {
    let row = sqlx::query(&format!("SELECT {} FROM playlists WHERE guid = ?", PLAYLIST_COLUMNS))
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    row.map(|r| playlist_from_row(&r)).transpose()
}

/// Fetch a public playlist by slug
pub async fn fetch_public_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Playlist>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM playlists WHERE slug = ? AND is_public = 1",
        PLAYLIST_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(|r| playlist_from_row(&r)).transpose()
}

/// Fetch a public playlist by id
pub async fn fetch_public_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<Playlist>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM playlists WHERE guid = ? AND is_public = 1",
        PLAYLIST_COLUMNS
    ))
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    row.map(|r| playlist_from_row(&r)).transpose()
}

/// Playlists the user owns or has been granted access to
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Playlist>> {
    // allowed_users is a JSON array of quoted ids; ids are uuid hex strings
    let rows = sqlx::query(&format!(
        "SELECT {} FROM playlists WHERE owner_id = ? OR allowed_users LIKE '%\"' || ? || '\"%' ORDER BY created_at",
        PLAYLIST_COLUMNS
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(playlist_from_row).collect()
}

/// Whether a slug is already taken
pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM playlists WHERE slug = ?)")
        .bind(slug)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Items of a playlist in position order
pub async fn list_items(pool: &SqlitePool, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
    let rows = sqlx::query(
        "SELECT guid, playlist_id, item_type, media_id, metadata, position, created_at \
         FROM playlist_items WHERE playlist_id = ? ORDER BY position",
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

/// Position for appending at the end of a playlist
pub async fn next_position(pool: &SqlitePool, playlist_id: &str) -> Result<i64> {
    let next: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_items WHERE playlist_id = ?",
    )
    .bind(playlist_id)
    .fetch_one(pool)
    .await?;

    Ok(next)
}

/// Shift positions >= `from_position` up by one to open a slot
pub async fn shift_positions_up(pool: &SqlitePool, playlist_id: &str, from_position: i64) -> Result<()> {
    sqlx::query(
        "UPDATE playlist_items SET position = position + 1 WHERE playlist_id = ? AND position >= ?",
    )
    .bind(playlist_id)
    .bind(from_position)
    .execute(pool)
    .await?;

    Ok(())
}

/// Shift positions > `above_position` down by one to close a gap
pub async fn shift_positions_down(
    pool: &SqlitePool,
    playlist_id: &str,
    above_position: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE playlist_items SET position = position - 1 WHERE playlist_id = ? AND position > ?",
    )
    .bind(playlist_id)
    .bind(above_position)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a new playlist item
pub async fn insert_item(pool: &SqlitePool, item: &PlaylistItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlist_items (guid, playlist_id, item_type, media_id, metadata, position, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.guid)
    .bind(&item.playlist_id)
    .bind(item.item_type.as_str())
    .bind(&item.media_id)
    .bind(item.metadata.as_ref().map(serde_json::to_string).transpose()?)
    .bind(item.position)
    .bind(storage_format(item.created_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch an item, scoped to its playlist
pub async fn find_item(
    pool: &SqlitePool,
    playlist_id: &str,
    item_guid: &str,
) -> Result<Option<PlaylistItem>> {
    let row = sqlx::query(
        "SELECT guid, playlist_id, item_type, media_id, metadata, position, created_at \
         FROM playlist_items WHERE guid = ? AND playlist_id = ?",
    )
    .bind(item_guid)
    .bind(playlist_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| item_from_row(&r)).transpose()
}

/// Delete an item by id
pub async fn delete_item(pool: &SqlitePool, item_guid: &str) -> Result<()> {
    sqlx::query("DELETE FROM playlist_items WHERE guid = ?")
        .bind(item_guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Move an item to a new position
pub async fn set_item_position(pool: &SqlitePool, item_guid: &str, position: i64) -> Result<()> {
    sqlx::query("UPDATE playlist_items SET position = ? WHERE guid = ?")
        .bind(position)
        .bind(item_guid)
        .execute(pool)
        .await?;

    Ok(())
}
