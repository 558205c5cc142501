use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::access::RequestContext;
use crate::audit::{self, AuditAction};
use crate::auth;
use crate::error::ApiError;

/// GET /api/auth/whoami - current identity, scope, and admin-mode echo.
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> Result<Response, ApiError> {
    let body = json!({
        "success": true,
        "data": {
            "user": {
                "id": ctx.user.id,
                "email": ctx.user.email,
                "role": ctx.user.role.as_str(),
            },
            "scope": {
                "role": ctx.scope.role.as_str(),
                "companyId": ctx.scope.company_id,
            },
            "adminMode": ctx.admin_mode.map(|m| json!({ "companyId": m.company_id })),
        }
    });
    Ok(Json(body).into_response())
}

/// POST /api/auth/logout - clear the session cookie and audit the logout.
pub async fn logout(Extension(ctx): Extension<RequestContext>) -> Result<Response, ApiError> {
    audit::record(
        &ctx,
        AuditAction::Logout,
        "user",
        Some(ctx.user.id.to_string()),
        None,
        None,
    );

    let cookie = auth::expired_session_cookie();
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({ "success": true })),
    )
        .into_response())
}
