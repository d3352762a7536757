//! soundwave-api - Soundwave backend HTTP service
//!
//! Serves authentication, playlists, content discovery, and
//! recommendations for the Soundwave discovery/playlist product.

use anyhow::Result;
use soundwave_api::{build_router, AppState};
use soundwave_common::config::{self, Settings};
use soundwave_common::time::utc_now;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Soundwave API (soundwave-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Resolve root folder and open the database
    let root_folder = config::resolve_root_folder(None);
    let db_path = config::prepare_root_folder(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = soundwave_common::db::init_database(&db_path).await?;

    let settings = Settings::from_env()?;
    let model_dir = settings.resolve_model_dir(&root_folder);
    info!("Model directory: {}", model_dir.display());

    if settings.tmdb_configured() {
        info!("TMDb discovery enabled");
    } else {
        info!("TMDb discovery disabled (TMDB_API_KEY not set)");
    }
    if settings.spotify_configured() {
        info!("Spotify discovery enabled");
    } else {
        info!("Spotify discovery disabled (SPOTIFY_CLIENT_ID/SECRET not set)");
    }

    let purged = soundwave_api::db::tokens::delete_expired(&pool, utc_now()).await?;
    if purged > 0 {
        info!("Purged {} expired auth tokens", purged);
    }

    let bind_addr = format!("{}:{}", settings.host, settings.port);
    let state = AppState::new(pool, settings, model_dir);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("soundwave-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
