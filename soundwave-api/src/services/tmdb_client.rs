//! TMDb API client
//!
//! Movie search and popular listings against The Movie Database v3 API.
//! Authenticates with an api_key query parameter and retries once on 429
//! honoring Retry-After (capped at one second).

use super::DiscoveryError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw movie entry as returned by TMDb
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbListResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

/// TMDb API client
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl TmdbClient {
    pub fn new(api_key: String, api_base: String) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn get_results(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<TmdbMovie>, DiscoveryError> {
        let url = format!("{}{}", self.api_base, path);

        for attempt in 0..2 {
            let response = self
                .http
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| DiscoveryError::Network(e.to_string()))?;

            let status = response.status();

            if status.as_u16() == 429 && attempt == 0 {
                let delay = retry_delay(response.headers().get("Retry-After"));
                warn!("TMDb rate limited, retrying after {:.2}s", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!("TMDb error {}: {}", status.as_u16(), body);
                return Err(DiscoveryError::Api(status.as_u16(), body));
            }

            let payload: TmdbListResponse = response
                .json()
                .await
                .map_err(|e| DiscoveryError::Parse(e.to_string()))?;
            return Ok(payload.results);
        }

        Err(DiscoveryError::RateLimited)
    }

    /// Search movies by title
    pub async fn search_movies(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<TmdbMovie>, DiscoveryError> {
        debug!(query, "searching TMDb movies");
        let mut results = self
            .get_results("/search/movie", &[("query", query), ("page", "1")])
            .await?;
        results.truncate(limit);
        Ok(results)
    }

    /// Currently popular movies
    pub async fn popular_movies(&self, limit: usize) -> Result<Vec<TmdbMovie>, DiscoveryError> {
        let mut results = self.get_results("/movie/popular", &[("page", "1")]).await?;
        results.truncate(limit);
        Ok(results)
    }
}

/// Delay before retrying a rate-limited request, capped at one second
fn retry_delay(retry_after: Option<&reqwest::header::HeaderValue>) -> Duration {
    retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .map(|secs| Duration::from_secs_f64(secs.min(1.0)))
        .unwrap_or(Duration::from_millis(200))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_delay_honors_header_with_cap() {
        let header = HeaderValue::from_static("0.5");
        assert_eq!(retry_delay(Some(&header)), Duration::from_secs_f64(0.5));

        let header = HeaderValue::from_static("30");
        assert_eq!(retry_delay(Some(&header)), Duration::from_secs(1));
    }

    #[test]
    fn test_retry_delay_default_without_header() {
        assert_eq!(retry_delay(None), Duration::from_millis(200));
    }

    #[test]
    fn test_movie_payload_parsing() {
        let raw = r#"{
            "page": 1,
            "results": [
                {"id": 603, "title": "The Matrix", "poster_path": "/matrix.jpg",
                 "overview": "A hacker learns the truth.", "popularity": 83.5},
                {"id": 604, "name": "Reloaded"}
            ]
        }"#;

        let parsed: TmdbListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].title.as_deref(), Some("The Matrix"));
        assert!(parsed.results[1].title.is_none());
        assert_eq!(parsed.results[1].name.as_deref(), Some("Reloaded"));
    }
}
