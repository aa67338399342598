use std::time::Duration;

use axum::http::{header, HeaderMap};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// `Set-Cookie` value carrying the refresh token.
pub fn refresh_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    build(token.to_string(), CookieDuration::seconds(max_age.as_secs() as i64), secure)
}

/// `Set-Cookie` value that makes the browser drop the refresh cookie.
pub fn clear_refresh_cookie(secure: bool) -> String {
    build(String::new(), CookieDuration::seconds(0), secure)
}

fn build(value: String, max_age: CookieDuration, secure: bool) -> String {
    Cookie::build((REFRESH_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .path("/")
        .build()
        .to_string()
}

/// Reads a non-empty cookie value from every `Cookie` header on the request.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|part| Cookie::parse(part.trim()).ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
