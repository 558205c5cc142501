use axum::{
    extract::{Extension, Path, Query, RawQuery},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::access::{RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::cache::LOCATIONS_CACHE;
use crate::database::{models::Location, Database, Repository};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const LOCATION_COLUMNS: &[&str] = &["name", "city", "country"];

static LOCATIONS: Repository<Location> = Repository::new("locations", LOCATION_COLUMNS);

#[derive(Debug, Deserialize)]
pub struct LocationPayload {
    pub name: String,
    pub city: String,
    pub country: String,
}

/// GET /api/locations - reference data, readable by every role; responses
/// are cached for a short TTL keyed by the query string.
pub async fn list(
    Extension(_ctx): Extension<RequestContext>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let cache_key = raw_query.unwrap_or_default();
    if let Some(cached) = LOCATIONS_CACHE.get(&cache_key).await {
        return Ok(Json(cached).into_response());
    }

    let pool = Database::pool().await?;
    let (locations, total) = LOCATIONS.page(&pool, LOCATIONS.query()?, &params).await?;

    let envelope = json!({
        "success": true,
        "data": locations,
        "pagination": Pagination::new(&params, total),
    });
    LOCATIONS_CACHE.insert(cache_key, envelope.clone()).await;

    Ok(Json(envelope).into_response())
}

/// GET /api/locations/:id
pub async fn get(
    Extension(_ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<Location> {
    let pool = Database::pool().await?;
    let location = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    Ok(ApiResponse::success(location))
}

/// POST /api/locations - admin only; invalidates the cached listings.
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<LocationPayload>,
) -> ApiResult<Location> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let location = sqlx::query_as::<_, Location>(
        "INSERT INTO locations (name, city, country) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.city)
    .bind(&payload.country)
    .fetch_one(&pool)
    .await?;

    LOCATIONS_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Create,
        "location",
        Some(location.id.to_string()),
        None,
        serde_json::to_value(&location).ok(),
    );

    Ok(ApiResponse::created(location))
}

/// PUT /api/locations/:id
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<LocationPayload>,
) -> ApiResult<Location> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;

    let location = sqlx::query_as::<_, Location>(
        "UPDATE locations SET name = $2, city = $3, country = $4 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.city)
    .bind(&payload.country)
    .fetch_one(&pool)
    .await?;

    LOCATIONS_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Update,
        "location",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&location).ok(),
    );

    Ok(ApiResponse::success(location))
}

/// DELETE /api/locations/:id - in-use locations surface as 409.
pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;

    sqlx::query("DELETE FROM locations WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    LOCATIONS_CACHE.invalidate_all();

    audit::record(
        &ctx,
        AuditAction::Delete,
        "location",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
