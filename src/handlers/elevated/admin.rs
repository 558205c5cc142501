use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::json;

use crate::access::{RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::database::{models::AuditLogRow, Database, Repository};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const AUDIT_COLUMNS: &[&str] = &[
    "user_id",
    "role",
    "company_id",
    "entity_type",
    "entity_id",
    "action",
    "ip",
    "created_at",
];

static AUDIT_LOG: Repository<AuditLogRow> = Repository::new("audit_log", AUDIT_COLUMNS);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterCompanyRequest {
    pub company_id: i64,
}

/// POST /api/admin/enter-company - begin impersonating a company.
///
/// Admin-mode itself is never persisted server-side: the response hands the
/// UI a redirect URL carrying the `admin_mode`/`company_id` parameters it
/// must attach to subsequent requests. Entering is an audited action.
pub async fn enter_company(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<EnterCompanyRequest>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let company_name = sqlx::query_scalar::<_, String>("SELECT name FROM companies WHERE id = $1")
        .bind(payload.company_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    audit::record(
        &ctx,
        AuditAction::Login,
        "company",
        Some(payload.company_id.to_string()),
        None,
        Some(json!({ "name": company_name })),
    );

    Ok(ApiResponse::success(json!({
        "companyId": payload.company_id,
        "redirectUrl": format!("/dashboard?admin_mode=true&company_id={}", payload.company_id),
    })))
}

/// POST /api/admin/exit-company - leave admin-mode; audited as a company
/// logout. The company being left comes from the request's admin-mode
/// parameters.
pub async fn exit_company(Extension(ctx): Extension<RequestContext>) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let company_id = ctx
        .admin_mode
        .map(|m| m.company_id)
        .ok_or_else(|| ApiError::bad_request("Not currently in admin mode"))?;

    audit::record(
        &ctx,
        AuditAction::Logout,
        "company",
        Some(company_id.to_string()),
        None,
        None,
    );

    Ok(ApiResponse::success(json!({
        "redirectUrl": "/dashboard",
    })))
}

/// GET /api/admin/audit-log - paginated, filterable view of the audit
/// trail. Reading it is itself recorded.
pub async fn list_audit_log(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<AuditLogRow>> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let (rows, total) = AUDIT_LOG.page(&pool, AUDIT_LOG.query()?, &params).await?;

    audit::record(&ctx, AuditAction::View, "audit_log", None, None, None);

    Ok(ApiResponse::paginated(rows, Pagination::new(&params, total)))
}

/// GET /api/admin/audit-log/:id
pub async fn get_audit_entry(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<AuditLogRow> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let row = sqlx::query_as::<_, AuditLogRow>("SELECT * FROM audit_log WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Audit entry not found"))?;

    Ok(ApiResponse::success(row))
}

/// DELETE /api/admin/audit-log - the one sanctioned way to remove audit
/// rows: an explicit bulk clear, which is itself written to the fresh log.
pub async fn clear_audit_log(
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let result = sqlx::query("DELETE FROM audit_log").execute(&pool).await?;
    let deleted = result.rows_affected();

    tracing::warn!(
        admin_id = ctx.user.id,
        deleted,
        "audit log bulk clear executed"
    );
    audit::record(
        &ctx,
        AuditAction::Delete,
        "audit_log",
        None,
        Some(json!({ "deleted": deleted })),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}
