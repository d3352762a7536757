//! Spotify API client
//!
//! Client-credentials flow against the Spotify accounts host with a cached
//! bearer token, renewed shortly before expiry. API requests force one
//! token refresh on 401 and retry on 429 like the TMDb client.

use super::DiscoveryError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum seconds of token lifetime kept in reserve
const TOKEN_RENEWAL_FLOOR_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Raw track entry as returned by Spotify search
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub album: Option<SpotifyAlbumRef>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyAlbumRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw album entry as returned by the new-releases listing
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct SearchTracksResponse {
    #[serde(default)]
    tracks: TrackPage,
}

#[derive(Debug, Default, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct NewReleasesResponse {
    #[serde(default)]
    albums: AlbumPage,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumPage {
    #[serde(default)]
    items: Vec<SpotifyAlbum>,
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenState {
    fn current(&self) -> Option<String> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if Instant::now() < expires_at => Some(token.clone()),
            _ => None,
        }
    }
}

/// Spotify API client
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_base: String,
    token: Mutex<TokenState>,
}

impl SpotifyClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        token_url: String,
        api_base: String,
    ) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token_url,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Mutex::new(TokenState::default()),
        })
    }

    /// Fetch a fresh access token from the accounts host
    async fn fetch_access_token(&self, state: &mut TokenState) -> Result<String, DiscoveryError> {
        debug!("Refreshing Spotify access token");
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| DiscoveryError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Spotify token fetch failed {}: {}", status.as_u16(), body);
            return Err(DiscoveryError::Auth(format!("token endpoint returned {}", status.as_u16())));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Auth(format!("malformed token payload: {}", e)))?;

        // Renew a bit earlier than expiry
        let lifetime = (payload.expires_in * 9 / 10).max(TOKEN_RENEWAL_FLOOR_SECS);
        state.access_token = Some(payload.access_token.clone());
        state.expires_at = Some(Instant::now() + Duration::from_secs(lifetime));
        info!("Fetched new Spotify access token");

        Ok(payload.access_token)
    }

    /// Current cached token, refreshed if absent or expired
    async fn ensure_token(&self, force: bool) -> Result<String, DiscoveryError> {
        let mut state = self.token.lock().await;
        if !force {
            if let Some(token) = state.current() {
                return Ok(token);
            }
        }
        self.fetch_access_token(&mut state).await
    }

    async fn request_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, DiscoveryError> {
        let url = format!("{}{}", self.api_base, path);
        let mut token = self.ensure_token(false).await?;

        for attempt in 0..3 {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(params)
                .send()
                .await
                .map_err(|e| DiscoveryError::Network(e.to_string()))?;

            let status = response.status();

            if status.as_u16() == 401 && attempt == 0 {
                // Token expired or revoked upstream; refresh once and retry
                info!("Spotify token rejected, forcing refresh");
                token = self.ensure_token(true).await?;
                continue;
            }

            if status.as_u16() == 429 {
                let delay = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|secs| Duration::from_secs_f64(secs.min(1.0)))
                    .unwrap_or(Duration::from_millis(200));
                warn!("Spotify rate limited, retrying after {:.2}s", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!("Spotify API error {}: {}", status.as_u16(), body);
                return Err(DiscoveryError::Api(status.as_u16(), body));
            }

            return response
                .json()
                .await
                .map_err(|e| DiscoveryError::Parse(e.to_string()));
        }

        Err(DiscoveryError::RateLimited)
    }

    /// Search tracks by free-text query
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SpotifyTrack>, DiscoveryError> {
        debug!(query, "searching Spotify tracks");
        let limit_str = limit.to_string();
        let payload = self
            .request_json(
                "/search",
                &[("q", query), ("type", "track"), ("limit", limit_str.as_str())],
            )
            .await?;
        let parsed: SearchTracksResponse =
            serde_json::from_value(payload).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
        Ok(parsed.tracks.items)
    }

    /// Newly released albums
    pub async fn new_releases(&self, limit: usize) -> Result<Vec<SpotifyAlbum>, DiscoveryError> {
        let limit_str = limit.to_string();
        let payload = self
            .request_json("/browse/new-releases", &[("limit", limit_str.as_str())])
            .await?;
        let parsed: NewReleasesResponse =
            serde_json::from_value(payload).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
        Ok(parsed.albums.items)
    }
}
