use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::json;

use crate::access::{RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::database::{models::Company, Database, Repository};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const COMPANY_COLUMNS: &[&str] = &["name", "owner_id", "location_id", "created_at"];

static COMPANIES: Repository<Company> = Repository::new("companies", COMPANY_COLUMNS);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompany {
    pub name: String,
    pub owner_id: i64,
    pub location_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub location_id: Option<i64>,
}

/// A company account may only see its own company row.
fn check_company_access(ctx: &RequestContext, company_id: i64) -> Result<(), ApiError> {
    if ctx.is_admin() {
        return Ok(());
    }
    if ctx.scope.company_id == Some(company_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not your company"))
    }
}

/// GET /api/companies - admin lists all; owner and manager see their own.
pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Company>> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let pool = Database::pool().await?;
    let mut query = COMPANIES.query()?;
    if !ctx.is_admin() {
        let company_id = ctx
            .scope
            .company_id
            .ok_or_else(|| ApiError::forbidden("No company scope resolved for this account"))?;
        query = query.and_eq("id", json!(company_id));
    } else if let Some(mode) = ctx.admin_mode {
        query = query.and_eq("id", json!(mode.company_id));
    }

    let (companies, total) = COMPANIES.page(&pool, query, &params).await?;
    Ok(ApiResponse::paginated(
        companies,
        Pagination::new(&params, total),
    ))
}

/// GET /api/companies/:id
pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<Company> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;
    check_company_access(&ctx, id)?;

    let pool = Database::pool().await?;
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(ApiResponse::success(company))
}

/// POST /api/companies - admin only. The designated owner must hold the
/// owner role and not own another company (unique index enforces the rest).
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CreateCompany>,
) -> ApiResult<Company> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let owner_role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = $1")
        .bind(payload.owner_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Owner user not found"))?;
    if owner_role != Role::Owner.as_str() {
        return Err(ApiError::bad_request("Designated owner must have the owner role"));
    }

    let company = sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, owner_id, location_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&payload.name)
    .bind(payload.owner_id)
    .bind(payload.location_id)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Create,
        "company",
        Some(company.id.to_string()),
        None,
        serde_json::to_value(&company).ok(),
    );

    Ok(ApiResponse::created(company))
}

/// PUT /api/companies/:id - admin, or the owner of this company.
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<UpdateCompany>,
) -> ApiResult<Company> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;
    check_company_access(&ctx, id)?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    let company = sqlx::query_as::<_, Company>(
        r#"
        UPDATE companies SET
            name = COALESCE($2, name),
            location_id = COALESCE($3, location_id)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.name.as_deref())
    .bind(payload.location_id)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Update,
        "company",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&company).ok(),
    );

    Ok(ApiResponse::success(company))
}

/// DELETE /api/companies/:id - admin only; cars and profiles referencing the
/// company surface as 409.
pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    audit::record(
        &ctx,
        AuditAction::Delete,
        "company",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
