//! soundwave-api library - Soundwave backend HTTP service
//!
//! Exposes authentication, playlist management, content discovery, and
//! recommendation endpoints on a single axum router.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use soundwave_common::config::Settings;
use soundwave_model::ModelError;

use crate::api::discovery::{MovieItem, MusicItem};
use crate::error::ApiError;
use crate::services::{RecommendationService, SpotifyClient, TmdbClient, TtlCache};

pub mod api;
pub mod db;
pub mod error;
pub mod services;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service settings loaded at startup
    pub settings: Arc<Settings>,
    /// Model artifact directory for the recommender
    pub model_dir: PathBuf,
    /// TMDb client (None while unconfigured)
    pub tmdb: Option<Arc<TmdbClient>>,
    /// Spotify client (None while unconfigured)
    pub spotify: Option<Arc<SpotifyClient>>,
    /// Discovery response caches
    pub movie_cache: Arc<TtlCache<Vec<MovieItem>>>,
    pub music_cache: Arc<TtlCache<Vec<MusicItem>>>,
    recommender: Arc<OnceCell<Arc<RecommendationService>>>,
}

impl AppState {
    /// Create application state, constructing provider clients where
    /// credentials are configured
    pub fn new(db: SqlitePool, settings: Settings, model_dir: PathBuf) -> Self {
        let ttl = Duration::from_secs(settings.cache_ttl_seconds);

        let tmdb = settings.tmdb_api_key.as_ref().and_then(|key| {
            match TmdbClient::new(key.clone(), settings.tmdb_api_base.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Failed to create TMDb client: {}", e);
                    None
                }
            }
        });

        let spotify = match (&settings.spotify_client_id, &settings.spotify_client_secret) {
            (Some(client_id), Some(client_secret)) => {
                match SpotifyClient::new(
                    client_id.clone(),
                    client_secret.clone(),
                    settings.spotify_token_url.clone(),
                    settings.spotify_api_base.clone(),
                ) {
                    Ok(client) => Some(Arc::new(client)),
                    Err(e) => {
                        warn!("Failed to create Spotify client: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            db,
            settings: Arc::new(settings),
            model_dir,
            tmdb,
            spotify,
            movie_cache: Arc::new(TtlCache::new(ttl)),
            music_cache: Arc::new(TtlCache::new(ttl)),
            recommender: Arc::new(OnceCell::new()),
        }
    }

    /// Recommendation service, loaded lazily on first use
    ///
    /// Load failures are not cached: artifacts produced after startup are
    /// picked up by a later request.
    pub async fn recommender(&self) -> Result<Arc<RecommendationService>, ApiError> {
        self.recommender
            .get_or_try_init(|| async {
                RecommendationService::load(&self.model_dir)
                    .map(Arc::new)
                    .map_err(|e| match e {
                        ModelError::ArtifactsMissing(path) => {
                            warn!("Model artifacts unavailable at {}", path.display());
                            ApiError::Unavailable("Model artifacts unavailable".to_string())
                        }
                        other => ApiError::internal(other),
                    })
            })
            .await
            .cloned()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health::health_routes())
        .merge(api::auth::auth_routes())
        .merge(api::playlists::playlist_routes())
        .merge(api::discovery::discovery_routes())
        .merge(api::recommendations::recommendation_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
