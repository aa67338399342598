use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    cookie::{clear_refresh_cookie, get_cookie, refresh_cookie, REFRESH_COOKIE_NAME},
    dto::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RefreshResponse,
        RegisterRequest, ResetPasswordRequest, VerifyResponse,
    },
    extractors::bearer_token,
    reset, services,
};
use crate::{error::AppError, extract::JsonBody, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/verify-token", get(verify_token))
}

fn set_refresh_cookie(state: &AppState, token: &str) -> [(header::HeaderName, String); 1] {
    [(
        header::SET_COOKIE,
        refresh_cookie(token, state.keys.refresh_ttl(), state.config.production),
    )]
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::register(&state, payload).await?;
    Ok(Json(MessageResponse::new("Registration successful!")))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = services::login(&state, payload).await?;
    Ok((
        set_refresh_cookie(&state, &outcome.tokens.refresh_token),
        Json(LoginResponse {
            message: "Login successful".into(),
            user: outcome.user,
            access_token: outcome.tokens.access_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    reset::request_reset(&state, payload).await?;
    Ok(Json(MessageResponse::new(
        "Password reset link sent to your email",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    reset::consume_reset(&state, payload).await?;
    Ok(Json(MessageResponse::new("Password reset successful!")))
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME);
    let tokens = services::refresh(&state, presented.as_deref()).await?;
    Ok((
        set_refresh_cookie(&state, &tokens.refresh_token),
        Json(RefreshResponse {
            access_token: tokens.access_token,
        }),
    ))
}

#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME);
    services::logout(&state, presented.as_deref()).await;
    (
        [(header::SET_COOKIE, clear_refresh_cookie(state.config.production))],
        Json(MessageResponse::new("Logged out successfully")),
    )
}

#[instrument(skip(state, headers))]
pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> Json<VerifyResponse> {
    let claims = services::verify_access(&state, bearer_token(&headers));
    Json(VerifyResponse {
        valid: claims.is_some(),
        user: claims,
    })
}
