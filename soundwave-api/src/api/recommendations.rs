//! Recommendation endpoints
//!
//! Serves per-user item recommendations from the lazily loaded model
//! artifacts. Unknown users receive the popularity fallback.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<String>,
    pub fallback_used: bool,
}

/// Build recommendation routes
pub fn recommendation_routes() -> Router<AppState> {
    Router::new().route("/recommendations/:user_id", get(get_recommendations))
}

/// GET /recommendations/:user_id
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    if !(1..=MAX_LIMIT).contains(&params.limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let service = state.recommender().await?;
    let (recommendations, fallback_used) =
        service.recommend_for_user(&user_id, params.limit as usize);

    if recommendations.is_empty() {
        return Err(ApiError::NotFound("No recommendations available".to_string()));
    }

    Ok(Json(RecommendationResponse {
        user_id,
        recommendations,
        fallback_used,
    }))
}
