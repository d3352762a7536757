//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct User {
    pub guid: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user taste profile captured at signup and editable later
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Kind of media a playlist item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistItemType {
    Movie,
    Music,
}

impl PlaylistItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistItemType::Movie => "movie",
            PlaylistItemType::Music => "music",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(PlaylistItemType::Movie),
            "music" => Some(PlaylistItemType::Music),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub guid: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub allowed_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Whether `user_id` may read this playlist
    pub fn can_read(&self, user_id: Option<&str>) -> bool {
        if self.is_public {
            return true;
        }
        match user_id {
            Some(id) => self.owner_id == id || self.allowed_users.iter().any(|u| u == id),
            None => false,
        }
    }

    /// Whether `user_id` may modify this playlist's items
    pub fn can_modify(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.allowed_users.iter().any(|u| u == user_id)
    }

    /// Whether `user_id` owns this playlist
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistItem {
    pub guid: String,
    pub playlist_id: String,
    pub item_type: PlaylistItemType,
    pub media_id: String,
    pub metadata: Option<serde_json::Value>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub guid: String,
    pub user_id: String,
    pub playlist_id: String,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
