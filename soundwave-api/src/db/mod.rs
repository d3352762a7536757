//! Per-entity database query modules

pub mod activity;
pub mod playlists;
pub mod tokens;
pub mod users;
