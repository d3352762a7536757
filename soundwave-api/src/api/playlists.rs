//! Playlist management endpoints
//!
//! Playlists are ordered collections of movie/music items with slugs,
//! public/private visibility, and per-user sharing. Item positions stay
//! contiguous from 0 across insertions, removals, and reorders. Every
//! mutation appends an activity record for recommendation training.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use soundwave_common::db::models::{Playlist, PlaylistItem, PlaylistItemType};
use soundwave_common::time::utc_now;

use crate::api::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::AppState;

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct PlaylistCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub allowed_users: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItemIn {
    #[serde(rename = "type")]
    pub item_type: PlaylistItemType,
    pub media_id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPayload {
    pub item_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShareInvitePayload {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItemOut {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: PlaylistItemType,
    pub media_id: String,
    pub metadata: Option<serde_json::Value>,
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct PlaylistOut {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub allowed_users: Vec<String>,
    pub items: Vec<PlaylistItemOut>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Build playlist routes
pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/playlists", post(create_playlist).get(list_playlists))
        .route("/playlists/public/:identifier", get(get_public_playlist))
        .route(
            "/playlists/:playlist_id",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlists/:playlist_id/items", post(add_item))
        .route("/playlists/:playlist_id/items/:item_id", delete(remove_item))
        .route("/playlists/:playlist_id/reorder", post(reorder_items))
        .route("/playlists/:playlist_id/share/invite", post(invite_user))
        .route(
            "/playlists/:playlist_id/share/allowed/:shared_user_id",
            delete(revoke_user),
        )
}

/// Derive a URL slug from a playlist name
fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else {
            slug.push('-');
        }
    }
    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "playlist".to_string()
    } else {
        slug.to_string()
    }
}

/// Make a slug unique by appending -2, -3, ... as needed
async fn ensure_unique_slug(pool: &SqlitePool, base_slug: &str) -> Result<String, ApiError> {
    let mut slug = base_slug.to_string();
    let mut suffix = 1;
    while db::playlists::slug_exists(pool, &slug).await? {
        suffix += 1;
        slug = format!("{}-{}", base_slug, suffix);
    }
    Ok(slug)
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Playlist name must be 1-{} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ApiError::Validation(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
    }
    Ok(())
}

async fn fetch_playlist_or_404(pool: &SqlitePool, playlist_id: &str) -> Result<Playlist, ApiError> {
    db::playlists::fetch_playlist(pool, playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))
}

async fn serialize_playlist(pool: &SqlitePool, playlist: &Playlist) -> Result<PlaylistOut, ApiError> {
    let items = db::playlists::list_items(pool, &playlist.guid)
        .await?
        .into_iter()
        .map(|item| PlaylistItemOut {
            id: item.guid,
            item_type: item.item_type,
            media_id: item.media_id,
            metadata: item.metadata,
            position: item.position,
        })
        .collect();

    Ok(PlaylistOut {
        id: playlist.guid.clone(),
        owner_id: playlist.owner_id.clone(),
        name: playlist.name.clone(),
        description: playlist.description.clone(),
        slug: playlist.slug.clone(),
        is_public: playlist.is_public,
        allowed_users: playlist.allowed_users.clone(),
        items,
        created_at: playlist.created_at,
        updated_at: playlist.updated_at,
    })
}

/// POST /playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<PlaylistCreate>,
) -> Result<(StatusCode, Json<PlaylistOut>), ApiError> {
    validate_name(&payload.name)?;
    validate_description(payload.description.as_deref())?;

    let slug = ensure_unique_slug(&state.db, &slugify(&payload.name)).await?;
    let now = utc_now();
    let playlist = Playlist {
        guid: Uuid::new_v4().to_string(),
        owner_id: user.id.clone(),
        name: payload.name,
        description: payload.description,
        slug,
        is_public: payload.is_public,
        allowed_users: dedup_preserving_order(payload.allowed_users),
        created_at: now,
        updated_at: now,
    };
    db::playlists::insert_playlist(&state.db, &playlist).await?;

    db::activity::log_activity(&state.db, &user.id, &playlist.guid, "playlist_created", None).await;

    let serialized = serialize_playlist(&state.db, &playlist).await?;
    Ok((StatusCode::CREATED, Json(serialized)))
}

/// GET /playlists
///
/// Playlists the caller owns or has been granted shared access to.
pub async fn list_playlists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<PlaylistOut>>, ApiError> {
    let playlists = db::playlists::list_for_user(&state.db, &user.id).await?;

    let mut serialized = Vec::with_capacity(playlists.len());
    for playlist in &playlists {
        serialized.push(serialize_playlist(&state.db, playlist).await?);
    }
    Ok(Json(serialized))
}

/// GET /playlists/:playlist_id
pub async fn get_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.can_read(Some(&user.id)) {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// GET /playlists/public/:identifier
///
/// Resolves a public playlist by slug first, then by id. No authentication.
pub async fn get_public_playlist(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let playlist = match db::playlists::fetch_public_by_slug(&state.db, &identifier).await? {
        Some(playlist) => playlist,
        None => db::playlists::fetch_public_by_guid(&state.db, &identifier)
            .await?
            .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?,
    };
    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// PATCH /playlists/:playlist_id
pub async fn update_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
    Json(payload): Json<PlaylistUpdate>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let mut playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.is_owner(&user.id) {
        return Err(ApiError::Forbidden("Only owner can update playlist".to_string()));
    }

    let mut changes = serde_json::Map::new();

    if let Some(name) = payload.name {
        validate_name(&name)?;
        if name != playlist.name {
            let slug = ensure_unique_slug(&state.db, &slugify(&name)).await?;
            changes.insert("name".to_string(), json!(&name));
            changes.insert("slug".to_string(), json!(&slug));
            playlist.name = name;
            playlist.slug = slug;
        }
    }
    if let Some(description) = payload.description {
        validate_description(Some(description.as_str()))?;
        changes.insert("description".to_string(), json!(&description));
        playlist.description = Some(description);
    }
    if let Some(is_public) = payload.is_public {
        changes.insert("is_public".to_string(), json!(is_public));
        playlist.is_public = is_public;
    }
    if let Some(allowed_users) = payload.allowed_users {
        let allowed_users = dedup_preserving_order(allowed_users);
        changes.insert("allowed_users".to_string(), json!(&allowed_users));
        playlist.allowed_users = allowed_users;
    }

    if changes.is_empty() {
        return Ok(Json(serialize_playlist(&state.db, &playlist).await?));
    }

    playlist.updated_at = utc_now();
    db::playlists::update_playlist(&state.db, &playlist).await?;

    db::activity::log_activity(
        &state.db,
        &user.id,
        &playlist.guid,
        "playlist_updated",
        Some(serde_json::Value::Object(changes)),
    )
    .await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// DELETE /playlists/:playlist_id
pub async fn delete_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.is_owner(&user.id) {
        return Err(ApiError::Forbidden("Only owner can delete playlist".to_string()));
    }

    db::playlists::delete_playlist(&state.db, &playlist.guid).await?;
    db::activity::log_activity(&state.db, &user.id, &playlist.guid, "playlist_deleted", None).await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /playlists/:playlist_id/items
///
/// Appends at the end when no position is given; otherwise opens a slot at
/// the requested position by shifting later items up.
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
    Json(payload): Json<PlaylistItemIn>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.can_modify(&user.id) {
        return Err(ApiError::Forbidden("No permission to modify playlist".to_string()));
    }
    if payload.media_id.is_empty() {
        return Err(ApiError::Validation("media_id must not be empty".to_string()));
    }

    let append_position = db::playlists::next_position(&state.db, &playlist.guid).await?;
    let position = match payload.position {
        None => append_position,
        Some(requested) => {
            // Clamp into [0, end] so positions stay contiguous
            let position = requested.clamp(0, append_position);
            if position < append_position {
                db::playlists::shift_positions_up(&state.db, &playlist.guid, position).await?;
            }
            position
        }
    };

    let item = PlaylistItem {
        guid: Uuid::new_v4().to_string(),
        playlist_id: playlist.guid.clone(),
        item_type: payload.item_type,
        media_id: payload.media_id,
        metadata: payload.metadata,
        position,
        created_at: utc_now(),
    };
    db::playlists::insert_item(&state.db, &item).await?;

    db::activity::log_activity(
        &state.db,
        &user.id,
        &playlist.guid,
        "item_added",
        Some(json!({
            "item_id": item.guid,
            "type": item.item_type.as_str(),
            "media_id": item.media_id,
        })),
    )
    .await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// DELETE /playlists/:playlist_id/items/:item_id
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((playlist_id, item_id)): Path<(String, String)>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.can_modify(&user.id) {
        return Err(ApiError::Forbidden("No permission to modify playlist".to_string()));
    }

    let item = db::playlists::find_item(&state.db, &playlist.guid, &item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    db::playlists::delete_item(&state.db, &item.guid).await?;
    db::playlists::shift_positions_down(&state.db, &playlist.guid, item.position).await?;

    db::activity::log_activity(
        &state.db,
        &user.id,
        &playlist.guid,
        "item_removed",
        Some(json!({ "item_id": item_id })),
    )
    .await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// POST /playlists/:playlist_id/reorder
///
/// The payload must list every current item id exactly once; positions
/// become the order given.
pub async fn reorder_items(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
    Json(payload): Json<ReorderPayload>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.can_modify(&user.id) {
        return Err(ApiError::Forbidden("No permission to modify playlist".to_string()));
    }

    let items = db::playlists::list_items(&state.db, &playlist.guid).await?;
    let existing_ids: HashSet<&str> = items.iter().map(|item| item.guid.as_str()).collect();
    let new_order: HashSet<&str> = payload.item_ids.iter().map(|id| id.as_str()).collect();
    if payload.item_ids.len() != items.len() || new_order != existing_ids {
        return Err(ApiError::BadRequest(
            "New order must include all items exactly once".to_string(),
        ));
    }

    let position_map: HashMap<&str, i64> = payload
        .item_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index as i64))
        .collect();

    for item in &items {
        let new_position = position_map[item.guid.as_str()];
        if item.position != new_position {
            db::playlists::set_item_position(&state.db, &item.guid, new_position).await?;
        }
    }

    db::activity::log_activity(&state.db, &user.id, &playlist.guid, "items_reordered", None).await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// POST /playlists/:playlist_id/share/invite
pub async fn invite_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(playlist_id): Path<String>,
    Json(payload): Json<ShareInvitePayload>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let mut playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.is_owner(&user.id) {
        return Err(ApiError::Forbidden("Only owner can modify sharing".to_string()));
    }

    let mut allowed = playlist.allowed_users.clone();
    allowed.push(payload.user_id.clone());
    playlist.allowed_users = dedup_preserving_order(allowed);
    playlist.updated_at = utc_now();
    db::playlists::update_playlist(&state.db, &playlist).await?;

    db::activity::log_activity(
        &state.db,
        &user.id,
        &playlist.guid,
        "share_invited",
        Some(json!({ "invited_user_id": payload.user_id })),
    )
    .await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}

/// DELETE /playlists/:playlist_id/share/allowed/:shared_user_id
pub async fn revoke_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((playlist_id, shared_user_id)): Path<(String, String)>,
) -> Result<Json<PlaylistOut>, ApiError> {
    let mut playlist = fetch_playlist_or_404(&state.db, &playlist_id).await?;
    if !playlist.is_owner(&user.id) {
        return Err(ApiError::Forbidden("Only owner can modify sharing".to_string()));
    }

    playlist.allowed_users.retain(|id| id != &shared_user_id);
    playlist.updated_at = utc_now();
    db::playlists::update_playlist(&state.db, &playlist).await?;

    db::activity::log_activity(
        &state.db,
        &user.id,
        &playlist.guid,
        "share_revoked",
        Some(json!({ "revoked_user_id": shared_user_id })),
    )
    .await;

    Ok(Json(serialize_playlist(&state.db, &playlist).await?))
}
