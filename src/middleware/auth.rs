use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;

use crate::access::AuthUser;
use crate::auth::{self, SESSION_COOKIE_NAME};
use crate::error::ApiError;

/// Session middleware: resolves the authenticated identity from the session
/// cookie (or a Bearer token for non-browser clients) and injects `AuthUser`.
///
/// Rejects with 401 before any scope or role logic runs, so a missing session
/// always yields Unauthorized, never Forbidden.
pub async fn session_auth(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let claims = auth::validate_jwt(&token).map_err(|e| {
        tracing::debug!("session token rejected: {}", e);
        ApiError::unauthorized("Invalid or expired session")
    })?;

    let auth_user = AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Session cookie first; `Authorization: Bearer` as fallback.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(raw) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for cookie in Cookie::split_parse(raw).flatten() {
            if cookie.name() == SESSION_COOKIE_NAME && !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("other=1; {}=cookie-token", SESSION_COOKIE_NAME)
                .parse()
                .unwrap(),
        );
        headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn empty_token_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }
}
