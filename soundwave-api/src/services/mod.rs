//! External integrations and in-process services

pub mod cache;
pub mod recommender;
pub mod spotify_client;
pub mod tmdb_client;

pub use cache::TtlCache;
pub use recommender::RecommendationService;
pub use spotify_client::SpotifyClient;
pub use tmdb_client::TmdbClient;

use thiserror::Error;

/// Errors from the discovery provider clients
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
