//! Authentication endpoints and the bearer-token extractor
//!
//! Signup and login mint opaque tokens persisted in the auth_tokens table.
//! Protected routes extract `AuthUser`, which resolves the Authorization
//! header against stored, unexpired tokens.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use soundwave_common::auth::{
    generate_salt, generate_token, hash_password, token_expiry, token_is_valid, verify_password,
    MIN_PASSWORD_LENGTH,
};
use soundwave_common::db::models::{AuthToken, User, UserPreferences};
use soundwave_common::time::utc_now;

use crate::db;
use crate::error::ApiError;
use crate::AppState;

/// Public view of a user account
#[derive(Debug, Clone, Serialize)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub preferences: UserPreferences,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub preferences: Option<UserPreferences>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserPublic,
}

/// Build authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

/// Authenticated user, extracted from the Authorization header
pub struct AuthUser(pub UserPublic);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::credentials)?;
        let token = header.strip_prefix("Bearer ").ok_or_else(ApiError::credentials)?;

        let user = resolve_token(state, token).await?;
        Ok(AuthUser(user))
    }
}

/// Resolve a bearer token to its user, enforcing expiry
pub async fn resolve_token(state: &AppState, token: &str) -> Result<UserPublic, ApiError> {
    let stored = db::tokens::find_token(&state.db, token)
        .await?
        .ok_or_else(ApiError::credentials)?;

    if !token_is_valid(stored.expires_at, utc_now()) {
        return Err(ApiError::credentials());
    }

    let user = db::users::find_user_by_guid(&state.db, &stored.user_id)
        .await?
        .ok_or_else(ApiError::credentials)?;
    let preferences = db::users::get_preferences(&state.db, &user.guid).await?;

    Ok(UserPublic {
        id: user.guid,
        email: user.email,
        preferences,
    })
}

/// Lowercase and validate an email address
fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    let valid = !email.contains(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };

    if valid {
        Ok(email)
    } else {
        Err(ApiError::Validation("Invalid email address".to_string()))
    }
}

/// Mint a token for the user and persist it
async fn mint_token(state: &AppState, user_id: &str) -> Result<AuthToken, ApiError> {
    let now = utc_now();
    let token = AuthToken {
        token: generate_token(),
        user_id: user_id.to_string(),
        expires_at: token_expiry(now, state.settings.token_expire_minutes),
        created_at: now,
    };
    db::tokens::store_token(&state.db, &token).await?;
    Ok(token)
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let email = normalize_email(&payload.email)?;
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    if db::users::find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let now = utc_now();
    let salt = generate_salt();
    let user = User {
        guid: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: hash_password(&payload.password, &salt),
        password_salt: salt,
        created_at: now,
    };
    db::users::create_user(&state.db, &user).await?;

    let preferences = payload.preferences.unwrap_or_default();
    db::users::upsert_preferences(&state.db, &user.guid, &preferences, now).await?;

    let token = mint_token(&state, &user.guid).await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: token.token,
            token_type: "bearer".to_string(),
            user: UserPublic {
                id: user.guid,
                email,
                preferences,
            },
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password are indistinguishable
    let rejection = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = db::users::find_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(rejection)?;
    if !verify_password(&payload.password, &user.password_salt, &user.password_hash) {
        return Err(rejection());
    }

    let token = mint_token(&state, &user.guid).await?;
    let preferences = db::users::get_preferences(&state.db, &user.guid).await?;

    Ok(Json(TokenResponse {
        access_token: token.token,
        token_type: "bearer".to_string(),
        user: UserPublic {
            id: user.guid,
            email: user.email,
            preferences,
        },
    }))
}

/// GET /auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<UserPublic> {
    Json(user)
}
