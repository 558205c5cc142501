pub mod password;

use chrono::{Duration, Utc};
use cookie::{time, Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::config;

/// Name of the session cookie carrying the signed identity token.
pub const SESSION_COOKIE_NAME: &str = "fleet_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, email: String, role: Role) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Build the session cookie for a freshly issued token. HttpOnly and
/// SameSite=Lax always; Secure follows the environment config.
pub fn session_cookie(token: String) -> Cookie<'static> {
    let cfg = config::config();
    let max_age = time::Duration::hours(cfg.security.jwt_expiry_hours as i64);

    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.security.secure_cookies)
        .max_age(max_age)
        .build()
}

/// Cookie that expires the session immediately (logout).
pub fn expired_session_cookie() -> Cookie<'static> {
    let cfg = config::config();

    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.security.secure_cookies)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret() {
        std::env::set_var("JWT_SECRET", "test-secret");
    }

    #[test]
    fn round_trips_claims() {
        with_secret();
        let claims = Claims::new(42, "owner@example.com".to_string(), Role::Owner);
        let token = generate_jwt(&claims).unwrap();
        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.sub, 42);
        assert_eq!(decoded.role, Role::Owner);
        assert_eq!(decoded.email, "owner@example.com");
    }

    #[test]
    fn rejects_tampered_token() {
        with_secret();
        let claims = Claims::new(1, "a@example.com".to_string(), Role::Client);
        let mut token = generate_jwt(&claims).unwrap();
        token.push('x');
        assert!(validate_jwt(&token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let c = session_cookie("tok".to_string());
        assert_eq!(c.name(), SESSION_COOKIE_NAME);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
    }
}
