use axum::{
    extract::{Extension, Path, Query, RawQuery},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::access::{RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::cache::{BRANDS_CACHE, CURRENCIES_CACHE};
use crate::database::{
    models::{Brand, Currency},
    Database, Repository,
};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

static BRANDS: Repository<Brand> = Repository::new("brands", &["name"]);
static CURRENCIES: Repository<Currency> = Repository::new("currencies", &["code", "name"]);

#[derive(Debug, Deserialize)]
pub struct BrandPayload {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyPayload {
    pub code: String,
    pub name: String,
}

/// GET /api/reference/brands - cached lookup list, readable by every role.
pub async fn list_brands(
    Extension(_ctx): Extension<RequestContext>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let cache_key = raw_query.unwrap_or_default();
    if let Some(cached) = BRANDS_CACHE.get(&cache_key).await {
        return Ok(Json(cached).into_response());
    }

    let pool = Database::pool().await?;
    let (brands, total) = BRANDS.page(&pool, BRANDS.query()?, &params).await?;

    let envelope = json!({
        "success": true,
        "data": brands,
        "pagination": Pagination::new(&params, total),
    });
    BRANDS_CACHE.insert(cache_key, envelope.clone()).await;

    Ok(Json(envelope).into_response())
}

/// POST /api/reference/brands - admin only.
pub async fn create_brand(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<BrandPayload>,
) -> ApiResult<Brand> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let brand = sqlx::query_as::<_, Brand>("INSERT INTO brands (name) VALUES ($1) RETURNING *")
        .bind(&payload.name)
        .fetch_one(&pool)
        .await?;

    BRANDS_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Create,
        "brand",
        Some(brand.id.to_string()),
        None,
        serde_json::to_value(&brand).ok(),
    );

    Ok(ApiResponse::created(brand))
}

/// DELETE /api/reference/brands/:id
pub async fn delete_brand(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Brand not found"))?;

    sqlx::query("DELETE FROM brands WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    BRANDS_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Delete,
        "brand",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}

/// GET /api/reference/currencies - cached lookup list.
pub async fn list_currencies(
    Extension(_ctx): Extension<RequestContext>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let cache_key = raw_query.unwrap_or_default();
    if let Some(cached) = CURRENCIES_CACHE.get(&cache_key).await {
        return Ok(Json(cached).into_response());
    }

    let pool = Database::pool().await?;
    let (currencies, total) = CURRENCIES.page(&pool, CURRENCIES.query()?, &params).await?;

    let envelope = json!({
        "success": true,
        "data": currencies,
        "pagination": Pagination::new(&params, total),
    });
    CURRENCIES_CACHE.insert(cache_key, envelope.clone()).await;

    Ok(Json(envelope).into_response())
}

/// POST /api/reference/currencies - admin only.
pub async fn create_currency(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CurrencyPayload>,
) -> ApiResult<Currency> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let currency = sqlx::query_as::<_, Currency>(
        "INSERT INTO currencies (code, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(&payload.code)
    .bind(&payload.name)
    .fetch_one(&pool)
    .await?;

    CURRENCIES_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Create,
        "currency",
        Some(currency.id.to_string()),
        None,
        serde_json::to_value(&currency).ok(),
    );

    Ok(ApiResponse::created(currency))
}

/// DELETE /api/reference/currencies/:id
pub async fn delete_currency(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Currency not found"))?;

    sqlx::query("DELETE FROM currencies WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    CURRENCIES_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Delete,
        "currency",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
