use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::audit::{self, AuditAction, NewAuditEntry};
use crate::auth::{self, password, Claims};
use crate::database::{models::User, Database};
use crate::error::ApiError;
use crate::rate_limit::{client_ip, Decision, FAILED_LOGIN_LIMITER, LOGIN_LIMITER};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFailedReport {
    pub email: Option<String>,
}

/// POST /auth/login - authenticate and set the session cookie.
///
/// Rate-limited per derived client IP before credentials are examined. Bad
/// credentials write a `login_failed` audit row (themselves capped by the
/// failed-login window so an attacker cannot flood the audit log); success
/// writes a `login` row.
pub async fn login(
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let Decision::Limited { retry_after_secs } = LOGIN_LIMITER.check(&ip) {
        tracing::warn!(ip = %ip, "login rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many login attempts, please try again later",
            retry_after_secs,
        ));
    }

    let pool = Database::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;

    let user = match user {
        Some(user) if password::verify_password(&payload.password, &user.password_hash) => user,
        other => {
            record_failed_login(&ip, user_agent, other.map(|u| u.id));
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let role = user
        .parsed_role()
        .map_err(|e| ApiError::internal_server_error(e))?;

    let claims = Claims::new(user.id, user.email.clone(), role);
    let token = auth::generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal_server_error("Could not establish session")
    })?;

    audit::record_entry(NewAuditEntry {
        user_id: Some(user.id),
        role: Some(role.as_str().to_string()),
        company_id: None,
        entity_type: "user".to_string(),
        entity_id: Some(user.id.to_string()),
        action: AuditAction::Login,
        before_state: None,
        after_state: None,
        ip: Some(ip),
        user_agent,
    });

    let cookie = auth::session_cookie(token.clone());
    let body = Json(json!({
        "success": true,
        "data": {
            "token": token,
            "user": {
                "id": user.id,
                "email": user.email,
                "name": user.name,
                "role": role.as_str(),
            }
        }
    }));

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        body,
    )
        .into_response())
}

/// POST /auth/login-failed - UI-reported client-side login failure.
///
/// Writes a `login_failed` audit row, capped at its own fixed window per IP.
pub async fn login_failed(
    headers: HeaderMap,
    Json(payload): Json<LoginFailedReport>,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers).unwrap_or_else(|| "unknown".to_string());

    if let Decision::Limited { retry_after_secs } = FAILED_LOGIN_LIMITER.check(&ip) {
        return Err(ApiError::too_many_requests(
            "Too many reports, please try again later",
            retry_after_secs,
        ));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    audit::record_entry(NewAuditEntry {
        user_id: None,
        role: None,
        company_id: None,
        entity_type: "user".to_string(),
        entity_id: payload.email,
        action: AuditAction::LoginFailed,
        before_state: None,
        after_state: None,
        ip: Some(ip),
        user_agent,
    });

    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

/// Server-observed bad credentials; the audit write is capped by the
/// failed-login window so the caller still gets a plain 401 either way.
fn record_failed_login(ip: &str, user_agent: Option<String>, user_id: Option<i64>) {
    if let Decision::Limited { .. } = FAILED_LOGIN_LIMITER.check(ip) {
        tracing::warn!(ip = %ip, "failed-login audit writes capped for this window");
        return;
    }

    audit::record_entry(NewAuditEntry {
        user_id,
        role: None,
        company_id: None,
        entity_type: "user".to_string(),
        entity_id: user_id.map(|id| id.to_string()),
        action: AuditAction::LoginFailed,
        before_state: None,
        after_state: None,
        ip: Some(ip.to_string()),
        user_agent,
    });
}
