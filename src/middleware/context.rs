use axum::{
    extract::{Query, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::access::{AdminMode, AuthUser, RequestContext, Role, Scope};
use crate::database::Database;
use crate::error::ApiError;
use crate::rate_limit::client_ip;

/// Admin-mode request parameters. Carried on any request; only honored for
/// admins, silently ignored for everyone else.
#[derive(Debug, Default, Deserialize)]
struct AdminModeParams {
    admin_mode: Option<String>,
    company_id: Option<i64>,
}

/// Context middleware: derives the per-request scope from the authenticated
/// identity, resolves admin-mode, captures client ip and user agent, and
/// injects a single `RequestContext` for handlers and the audit logger.
///
/// Scope and admin-mode are recomputed on every request; nothing here is
/// persisted server-side.
pub async fn request_context(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Session resolution required before scope"))?;

    let scope = resolve_scope(&auth_user).await?;
    let admin_mode = resolve_admin_mode(&request, scope.role);

    let headers = request.headers();
    let ctx = RequestContext {
        ip: client_ip(headers),
        user_agent: user_agent(headers),
        user: auth_user,
        scope,
        admin_mode,
    };

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Map an identity to `{role, company_id}`. Owners resolve through the
/// company they own, managers through their profile row; admins and clients
/// are not company-bound.
pub async fn resolve_scope(user: &AuthUser) -> Result<Scope, ApiError> {
    let company_id = match user.role {
        Role::Admin | Role::Client => None,
        Role::Owner => {
            let pool = Database::pool().await?;
            sqlx::query_scalar::<_, i64>("SELECT id FROM companies WHERE owner_id = $1")
                .bind(user.id)
                .fetch_optional(&pool)
                .await?
        }
        Role::Manager => {
            let pool = Database::pool().await?;
            sqlx::query_scalar::<_, i64>(
                "SELECT company_id FROM manager_profiles WHERE user_id = $1",
            )
            .bind(user.id)
            .fetch_optional(&pool)
            .await?
        }
    };

    Ok(Scope {
        role: user.role,
        company_id,
    })
}

/// `admin_mode=true&company_id=N` becomes the effective company for this
/// request only, iff the caller is an admin. No privilege escalation path:
/// for any other role the parameters have no effect.
fn resolve_admin_mode(request: &Request, role: Role) -> Option<AdminMode> {
    if role != Role::Admin {
        return None;
    }

    let params = Query::<AdminModeParams>::try_from_uri(request.uri())
        .map(|q| q.0)
        .unwrap_or_default();

    match (params.admin_mode.as_deref(), params.company_id) {
        (Some("true"), Some(company_id)) => Some(AdminMode { company_id }),
        _ => None,
    }
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
