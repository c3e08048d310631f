use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse},
        error::AuthError,
        extractors::AuthUser,
        jwt::JwtKeys,
        services::{login_user, register_user},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    let user = register_user(
        state.users.as_ref(),
        &payload.name,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let keys = JwtKeys::from_ref(&state);
    let token = login_user(
        state.users.as_ref(),
        &keys,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
    }))
}

#[instrument(skip(state, claims))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .users
        .find_by_email(&claims.email)
        .await?
        .filter(|u| u.id == claims.id)
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(user.into()))
}
