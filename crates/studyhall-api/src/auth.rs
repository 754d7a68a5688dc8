use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::sync::Mutex;

use studyhall_accounts::AccountBook;
use studyhall_directory::{DirectoryStore, Relay};
use studyhall_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, UpdateProfileRequest};
use studyhall_types::models::Profile;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub accounts: AccountBook,
    pub directory: Arc<Mutex<DirectoryStore>>,
    pub relay: Relay,
    pub jwt_secret: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Argon2 is deliberately slow; keep it off the async workers
    let accounts = state.accounts.clone();
    let profile = tokio::task::spawn_blocking(move || {
        accounts.signup(&req.email, &req.username, &req.password, &req.confirm_password)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.accounts.clone();
    let profile =
        tokio::task::spawn_blocking(move || accounts.login(&req.login, &req.password)).await??;

    let token = create_token(&state.jwt_secret, &profile).map_err(|e| {
        tracing::error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    Ok(Json(LoginResponse { profile, token }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.accounts.clone();
    let email = claims.sub.clone();
    let profile = tokio::task::spawn_blocking(move || accounts.profile(&email))
        .await??
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Account not found."))?;

    Ok(Json(profile))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.accounts.clone();
    let email = claims.sub.clone();
    let profile = tokio::task::spawn_blocking(move || {
        accounts.update_profile(&email, &req.username, req.bio.as_deref())
    })
    .await??;

    // Reissue so the username claim follows the rename
    let token = create_token(&state.jwt_secret, &profile).map_err(|e| {
        tracing::error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    Ok(Json(LoginResponse { profile, token }))
}

pub fn create_token(secret: &str, profile: &Profile) -> anyhow::Result<String> {
    let claims = Claims {
        sub: profile.user_id(),
        username: profile.username.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
