use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::{
    dto::{required, ForgotPasswordRequest, ResetPasswordRequest},
    password::check_new_password,
};
use crate::{error::AppError, state::AppState};

/// 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{frontend_url}/reset-password/{token}")
}

/// Idle -> PendingReset: stores a new token (overwriting any previous one) and mails the link.
#[instrument(skip(state, req))]
pub async fn request_reset(state: &AppState, req: ForgotPasswordRequest) -> Result<(), AppError> {
    let email = required(req.email).ok_or_else(|| AppError::validation("Email is required"))?;

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::internal("Error sending reset email", e))?
        .ok_or_else(|| {
            warn!("password reset requested for unknown email");
            AppError::not_found("User not found")
        })?;

    let token = generate_reset_token();
    let expires = OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_ttl_minutes);
    state
        .users
        .set_reset_token(user.id, &token, expires)
        .await
        .map_err(|e| AppError::internal("Error sending reset email", e))?;

    let link = reset_link(&state.config.frontend_url, &token);
    state
        .mailer
        .send_password_reset(&user.email, &link)
        .await
        .map_err(|e| AppError::internal("Error sending reset email", e))?;

    info!(user_id = %user.id, "password reset issued");
    Ok(())
}

/// PendingReset -> Idle: replaces the password if the token matches and has not expired.
#[instrument(skip(state, req))]
pub async fn consume_reset(state: &AppState, req: ResetPasswordRequest) -> Result<(), AppError> {
    let (Some(token), Some(password), Some(confirm)) = (
        required(req.token),
        required(req.password),
        required(req.confirm_password),
    ) else {
        return Err(AppError::validation("All fields are required !"));
    };
    check_new_password(&password, &confirm)?;

    let invalid = || {
        warn!("invalid or expired reset token");
        AppError::InvalidOrExpiredToken
    };

    // Cheap rejection before paying for a hash.
    state
        .users
        .find_by_reset_token(&token)
        .await
        .map_err(|e| AppError::internal("Error resetting password", e))?
        .filter(|u| u.reset_token_matches(&token, OffsetDateTime::now_utc()))
        .ok_or_else(invalid)?;

    let hash = state
        .hasher
        .hash_blocking(password)
        .await
        .map_err(|e| AppError::internal("Error resetting password", e))?;

    // Checked and cleared in one store call.
    let user_id = state
        .users
        .consume_reset_token(&token, &hash, OffsetDateTime::now_utc())
        .await
        .map_err(|e| AppError::internal("Error resetting password", e))?
        .ok_or_else(invalid)?;

    info!(user_id = %user_id, "password reset completed");
    Ok(())
}
