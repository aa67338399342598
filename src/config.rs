use anyhow::Context;
use serde::Deserialize;

const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_TTL_DAYS: i64 = 365;
const MAX_RESET_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Argon2 cost factors. `None` keeps the argon2 crate default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashConfig {
    pub m_cost: Option<u32>,
    pub t_cost: Option<u32>,
    pub p_cost: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub hash: HashConfig,
    pub frontend_url: String,
    pub reset_ttl_minutes: i64,
    pub production: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let jwt = JwtConfig {
            access_secret: std::env::var("ACCESS_SECRET").context("ACCESS_SECRET is not set")?,
            refresh_secret: std::env::var("REFRESH_SECRET").context("REFRESH_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tasktrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tasktrack-users".into()),
            access_ttl_minutes: parse_var("ACCESS_TTL_MINUTES").unwrap_or(15),
            refresh_ttl_days: parse_var("REFRESH_TTL_DAYS").unwrap_or(7),
        };

        let username = std::env::var("EMAIL_USER").unwrap_or_default();
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            smtp_port: parse_var("SMTP_PORT").unwrap_or(465),
            password: std::env::var("EMAIL_PASS").unwrap_or_default(),
            from: std::env::var("EMAIL_FROM").unwrap_or_else(|_| username.clone()),
            username,
        };

        let hash = HashConfig {
            m_cost: parse_var("PASSWORD_HASH_M_COST"),
            t_cost: parse_var("PASSWORD_HASH_T_COST"),
            p_cost: parse_var("PASSWORD_HASH_P_COST"),
        };

        let config = Self {
            database_url,
            jwt,
            mail,
            hash,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            reset_ttl_minutes: parse_var("RESET_TTL_MINUTES").unwrap_or(60),
            production: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT").unwrap_or(5000),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects secrets and lifetimes that would break token handling at request time.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.jwt.access_secret != self.jwt.refresh_secret,
            "ACCESS_SECRET and REFRESH_SECRET must differ"
        );
        anyhow::ensure!(
            (1..=MAX_ACCESS_TTL_MINUTES).contains(&self.jwt.access_ttl_minutes),
            "ACCESS_TTL_MINUTES must be between 1 and {MAX_ACCESS_TTL_MINUTES}"
        );
        anyhow::ensure!(
            (1..=MAX_REFRESH_TTL_DAYS).contains(&self.jwt.refresh_ttl_days),
            "REFRESH_TTL_DAYS must be between 1 and {MAX_REFRESH_TTL_DAYS}"
        );
        anyhow::ensure!(
            (1..=MAX_RESET_TTL_MINUTES).contains(&self.reset_ttl_minutes),
            "RESET_TTL_MINUTES must be between 1 and {MAX_RESET_TTL_MINUTES}"
        );
        Ok(())
    }

    /// Browser origins allowed to call the API with credentials.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        if !origins.contains(&self.frontend_url) {
            origins.push(self.frontend_url.clone());
        }
        origins
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}
