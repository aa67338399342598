use tracing::{info, instrument, warn};

use super::{
    claims::Claims,
    dto::{required, LoginRequest, PublicUser, RegisterRequest},
    password::{check_new_password, is_valid_email},
    repo::StoreError,
};
use crate::{error::AppError, state::AppState};

/// Freshly issued token pair; the refresh half is only ever sent as a cookie.
#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub tokens: IssuedTokens,
    pub user: PublicUser,
}

fn issue_pair(state: &AppState, user_id: uuid::Uuid) -> Result<IssuedTokens, AppError> {
    let access_token = state
        .keys
        .sign_access(user_id)
        .map_err(|e| AppError::internal("Token signing failed", e))?;
    let refresh_token = state
        .keys
        .sign_refresh(user_id)
        .map_err(|e| AppError::internal("Token signing failed", e))?;
    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, req))]
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<(), AppError> {
    let (Some(name), Some(email), Some(password), Some(confirm)) = (
        required(req.name),
        required(req.email),
        required(req.password),
        required(req.confirm_password),
    ) else {
        return Err(AppError::validation("All fields are required !"));
    };
    check_new_password(&password, &confirm)?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    if state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::internal("Error registering", e))?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = state
        .hasher
        .hash_blocking(password)
        .await
        .map_err(|e| AppError::internal("Error registering", e))?;

    // The unique index still decides if two registrations race past the lookup.
    let user = match state.users.create(&name, &email, &hash).await {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }
        Err(e) => return Err(AppError::internal("Error registering", e)),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(())
}

#[instrument(skip(state, req))]
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginOutcome, AppError> {
    let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
        return Err(AppError::validation("Email and password are required"));
    };

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::internal("Login error", e))?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            AppError::not_found("User not found!")
        })?;

    let ok = state
        .hasher
        .verify_blocking(password, user.password_hash.clone())
        .await
        .map_err(|e| AppError::internal("Login error", e))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = issue_pair(state, user.id)?;
    state
        .users
        .set_refresh_token(user.id, Some(&tokens.refresh_token))
        .await
        .map_err(|e| AppError::internal("Login error", e))?;

    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome {
        tokens,
        user: PublicUser {
            name: user.name,
            email: user.email,
        },
    })
}

/// Rotates both tokens. Only the currently stored refresh token is accepted.
#[instrument(skip(state, presented))]
pub async fn refresh(state: &AppState, presented: Option<&str>) -> Result<IssuedTokens, AppError> {
    let presented = presented.ok_or_else(|| AppError::Unauthenticated("No refresh token".into()))?;
    let rejected = || AppError::Forbidden("Invalid refresh token".into());

    let claims = state.keys.verify_refresh(presented).map_err(|_| {
        warn!("refresh token failed verification");
        rejected()
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|e| AppError::internal("Refresh error", e))?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "refresh for missing user");
            rejected()
        })?;
    if user.refresh_token.as_deref() != Some(presented) {
        warn!(user_id = %user.id, "refresh token reuse or stale token");
        return Err(rejected());
    }

    let tokens = issue_pair(state, user.id)?;
    let swapped = state
        .users
        .swap_refresh_token(user.id, presented, Some(&tokens.refresh_token))
        .await
        .map_err(|e| AppError::internal("Refresh error", e))?;
    if !swapped {
        warn!(user_id = %user.id, "refresh token rotated concurrently");
        return Err(rejected());
    }

    info!(user_id = %user.id, "tokens rotated");
    Ok(tokens)
}

/// Best effort: any failure is logged and swallowed.
#[instrument(skip(state, presented))]
pub async fn logout(state: &AppState, presented: Option<&str>) {
    let Some(token) = presented else {
        return;
    };
    let Ok(claims) = state.keys.verify_refresh(token) else {
        warn!("logout with unverifiable refresh token");
        return;
    };
    match state.users.set_refresh_token(claims.sub, None).await {
        Ok(()) => info!(user_id = %claims.sub, "user logged out"),
        Err(e) => warn!(error = %e, user_id = %claims.sub, "failed to clear refresh token"),
    }
}

/// Pure check of an access token.
pub fn verify_access(state: &AppState, token: Option<&str>) -> Option<Claims> {
    token.and_then(|t| state.keys.verify_access(t).ok())
}
