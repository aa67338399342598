use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>, // the single live refresh token
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// True when `token` is the stored reset token and `now` is before its expiry.
    pub fn reset_token_matches(&self, token: &str, now: OffsetDateTime) -> bool {
        match (&self.reset_password_token, self.reset_password_expires) {
            (Some(stored), Some(expires)) => stored == token && now < expires,
            _ => false,
        }
    }
}
