//! Content discovery endpoints
//!
//! Movie search/popular via TMDb and music search/popular via Spotify.
//! Responses are cached in-memory for a short TTL. Endpoints degrade to
//! 503 while the relevant provider credentials are not configured.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ApiError;
use crate::services::spotify_client::{SpotifyAlbum, SpotifyTrack};
use crate::services::tmdb_client::TmdbMovie;
use crate::AppState;

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const MAX_LIMIT: i64 = 50;

/// Movie entry as served to the frontend
#[derive(Debug, Clone, Serialize)]
pub struct MovieItem {
    pub id: String,
    pub title: String,
    pub poster: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<f64>,
}

/// Music entry as served to the frontend
#[derive(Debug, Clone, Serialize)]
pub struct MusicItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "albumArt")]
    pub album_art: Option<String>,
    pub description: Option<String>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// Build discovery routes
pub fn discovery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/movies/search", get(search_movies))
        .route("/api/movies/popular", get(popular_movies))
        .route("/api/music/search", get(search_music))
        .route("/api/music/popular", get(popular_music))
}

fn validate_limit(limit: i64) -> Result<usize, ApiError> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit as usize)
    } else {
        Err(ApiError::Validation(format!("limit must be between 1 and {}", MAX_LIMIT)))
    }
}

fn validate_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".to_string()));
    }
    Ok(())
}

fn movie_dto(movie: &TmdbMovie) -> MovieItem {
    MovieItem {
        id: movie.id.to_string(),
        title: movie
            .title
            .clone()
            .or_else(|| movie.name.clone())
            .unwrap_or_default(),
        poster: movie
            .poster_path
            .as_ref()
            .map(|path| format!("{}{}", TMDB_IMAGE_BASE, path)),
        overview: movie.overview.clone(),
        popularity: movie.popularity,
    }
}

fn music_track_dto(track: &SpotifyTrack) -> MusicItem {
    let album_art = track
        .album
        .as_ref()
        .and_then(|album| album.images.first())
        .map(|image| image.url.clone());
    let artists: Vec<&str> = track
        .artists
        .iter()
        .filter_map(|artist| artist.name.as_deref())
        .collect();

    MusicItem {
        id: track.id.clone().unwrap_or_default(),
        name: track.name.clone().unwrap_or_default(),
        album_art,
        description: if artists.is_empty() { None } else { Some(artists.join(", ")) },
        popularity: track.popularity,
    }
}

fn music_album_dto(album: &SpotifyAlbum) -> MusicItem {
    let album_art = album.images.first().map(|image| image.url.clone());
    let artists: Vec<&str> = album
        .artists
        .iter()
        .filter_map(|artist| artist.name.as_deref())
        .collect();

    MusicItem {
        id: album.id.clone().unwrap_or_default(),
        name: album.name.clone().unwrap_or_default(),
        album_art,
        description: if artists.is_empty() { None } else { Some(artists.join(", ")) },
        popularity: Some(0.0),
    }
}

/// GET /api/movies/search
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MovieItem>>, ApiError> {
    validate_query(&params.query)?;
    let limit = validate_limit(params.limit)?;
    let Some(tmdb) = &state.tmdb else {
        return Err(ApiError::Unavailable("TMDb API not configured".to_string()));
    };

    let cache_key = format!("movies:search:{}:{}", params.query, limit);
    if let Some(cached) = state.movie_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let results = tmdb.search_movies(&params.query, limit).await.map_err(|e| {
        error!("Movie search failed: {}", e);
        ApiError::Upstream("Upstream TMDb error".to_string())
    })?;

    let items: Vec<MovieItem> = results.iter().map(movie_dto).collect();
    state.movie_cache.set(&cache_key, items.clone());
    Ok(Json(items))
}

/// GET /api/movies/popular
pub async fn popular_movies(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<MovieItem>>, ApiError> {
    let limit = validate_limit(params.limit)?;
    let Some(tmdb) = &state.tmdb else {
        return Err(ApiError::Unavailable("TMDb API not configured".to_string()));
    };

    let cache_key = format!("movies:popular:{}", limit);
    if let Some(cached) = state.movie_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let results = tmdb.popular_movies(limit).await.map_err(|e| {
        error!("Popular movies fetch failed: {}", e);
        ApiError::Upstream("Upstream TMDb error".to_string())
    })?;

    let items: Vec<MovieItem> = results.iter().map(movie_dto).collect();
    state.movie_cache.set(&cache_key, items.clone());
    Ok(Json(items))
}

/// GET /api/music/search
pub async fn search_music(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MusicItem>>, ApiError> {
    validate_query(&params.query)?;
    let limit = validate_limit(params.limit)?;
    let Some(spotify) = &state.spotify else {
        return Err(ApiError::Unavailable("Spotify API not configured".to_string()));
    };

    let cache_key = format!("music:search:{}:{}", params.query, limit);
    if let Some(cached) = state.music_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let tracks = spotify.search_tracks(&params.query, limit).await.map_err(|e| {
        error!("Music search failed: {}", e);
        ApiError::Upstream("Upstream Spotify error".to_string())
    })?;

    let items: Vec<MusicItem> = tracks.iter().map(music_track_dto).collect();
    state.music_cache.set(&cache_key, items.clone());
    Ok(Json(items))
}

/// GET /api/music/popular
pub async fn popular_music(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<MusicItem>>, ApiError> {
    let limit = validate_limit(params.limit)?;
    let Some(spotify) = &state.spotify else {
        return Err(ApiError::Unavailable("Spotify API not configured".to_string()));
    };

    let cache_key = format!("music:popular:{}", limit);
    if let Some(cached) = state.music_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let albums = spotify.new_releases(limit).await.map_err(|e| {
        error!("Popular music fetch failed: {}", e);
        ApiError::Upstream("Upstream Spotify error".to_string())
    })?;

    let items: Vec<MusicItem> = albums.iter().map(music_album_dto).collect();
    state.music_cache.set(&cache_key, items.clone());
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::spotify_client::{SpotifyAlbumRef, SpotifyArtist, SpotifyImage};

    #[test]
    fn test_movie_dto_builds_poster_url() {
        let movie = TmdbMovie {
            id: 603,
            title: Some("The Matrix".to_string()),
            name: None,
            overview: Some("A hacker learns the truth.".to_string()),
            poster_path: Some("/matrix.jpg".to_string()),
            popularity: Some(83.5),
        };

        let dto = movie_dto(&movie);
        assert_eq!(dto.id, "603");
        assert_eq!(dto.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/matrix.jpg"));
    }

    #[test]
    fn test_movie_dto_title_falls_back_to_name() {
        let movie = TmdbMovie {
            id: 1,
            title: None,
            name: Some("Series Title".to_string()),
            overview: None,
            poster_path: None,
            popularity: None,
        };

        let dto = movie_dto(&movie);
        assert_eq!(dto.title, "Series Title");
        assert!(dto.poster.is_none());
    }

    #[test]
    fn test_track_dto_joins_artists() {
        let track = SpotifyTrack {
            id: Some("t1".to_string()),
            name: Some("Song".to_string()),
            popularity: Some(70.0),
            album: Some(SpotifyAlbumRef {
                name: Some("Album".to_string()),
                images: vec![
                    SpotifyImage { url: "http://large".to_string() },
                    SpotifyImage { url: "http://small".to_string() },
                ],
            }),
            artists: vec![
                SpotifyArtist { name: Some("A".to_string()) },
                SpotifyArtist { name: Some("B".to_string()) },
            ],
        };

        let dto = music_track_dto(&track);
        assert_eq!(dto.description.as_deref(), Some("A, B"));
        // First image is the largest
        assert_eq!(dto.album_art.as_deref(), Some("http://large"));
    }

    #[test]
    fn test_track_dto_without_artists() {
        let track = SpotifyTrack {
            id: None,
            name: None,
            popularity: None,
            album: None,
            artists: vec![],
        };

        let dto = music_track_dto(&track);
        assert_eq!(dto.id, "");
        assert!(dto.description.is_none());
        assert!(dto.album_art.is_none());
    }

    #[test]
    fn test_album_dto_reports_zero_popularity() {
        let album = SpotifyAlbum {
            id: Some("a1".to_string()),
            name: Some("Fresh".to_string()),
            images: vec![SpotifyImage { url: "http://img".to_string() }],
            artists: vec![SpotifyArtist { name: Some("C".to_string()) }],
        };

        let dto = music_album_dto(&album);
        assert_eq!(dto.popularity, Some(0.0));
        assert_eq!(dto.description.as_deref(), Some("C"));
    }

    #[test]
    fn test_limit_validation() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(50).is_ok());
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(51).is_err());
    }

    #[test]
    fn test_query_validation() {
        assert!(validate_query("dune").is_ok());
        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
    }
}
