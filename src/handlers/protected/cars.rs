use axum::extract::{Extension, Path, Query};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::access::{ensure_company_access, target_company_id, RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::database::{models::Car, Database, Repository};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

/// Columns clients may filter and sort on.
const CAR_COLUMNS: &[&str] = &[
    "company_id",
    "brand_id",
    "location_id",
    "plate",
    "model",
    "year",
    "daily_rate",
    "currency_id",
    "status",
    "created_at",
];

static CARS: Repository<Car> = Repository::new("cars", CAR_COLUMNS);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCar {
    pub company_id: Option<i64>,
    pub brand_id: i64,
    pub location_id: Option<i64>,
    pub plate: String,
    pub model: String,
    pub year: i32,
    pub daily_rate: Decimal,
    pub currency_id: i64,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCar {
    pub company_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub location_id: Option<i64>,
    pub plate: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub daily_rate: Option<Decimal>,
    pub currency_id: Option<i64>,
    pub status: Option<String>,
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    match status {
        "available" | "rented" | "maintenance" => Ok(()),
        other => Err(ApiError::bad_request(format!(
            "unknown car status: {}",
            other
        ))),
    }
}

/// GET /api/cars - list. Clients browse the whole fleet; owner and manager
/// listings are pinned to their company, admin-mode pins the impersonated one.
pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Car>> {
    let pool = Database::pool().await?;

    let mut query = CARS.query()?;
    if ctx.scope.role != Role::Client {
        // Forbidden for a scopeless owner/manager; admin without admin-mode
        // resolves to None and lists platform-wide.
        if let Some(company_id) = target_company_id(&ctx, None)? {
            query = query.and_eq("company_id", json!(company_id));
        }
    }

    let (cars, total) = CARS.page(&pool, query, &params).await?;
    Ok(ApiResponse::paginated(cars, Pagination::new(&params, total)))
}

/// GET /api/cars/:id
pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<Car> {
    let pool = Database::pool().await?;
    let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;

    // Clients may inspect any listed car; company accounts only their own.
    if ctx.scope.role != Role::Client {
        ensure_company_access(&ctx, car.company_id, None)?;
    }

    Ok(ApiResponse::success(car))
}

/// POST /api/cars
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CreateCar>,
) -> ApiResult<Car> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let company_id = target_company_id(&ctx, payload.company_id)?
        .ok_or_else(|| ApiError::bad_request("companyId is required"))?;

    let status = payload.status.unwrap_or_else(|| "available".to_string());
    validate_status(&status)?;

    let pool = Database::pool().await?;
    let car = sqlx::query_as::<_, Car>(
        r#"
        INSERT INTO cars
            (company_id, brand_id, location_id, plate, model, year, daily_rate, currency_id, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(company_id)
    .bind(payload.brand_id)
    .bind(payload.location_id)
    .bind(&payload.plate)
    .bind(&payload.model)
    .bind(payload.year)
    .bind(payload.daily_rate)
    .bind(payload.currency_id)
    .bind(&status)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Create,
        "car",
        Some(car.id.to_string()),
        None,
        serde_json::to_value(&car).ok(),
    );

    Ok(ApiResponse::created(car))
}

/// PUT /api/cars/:id
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<UpdateCar>,
) -> ApiResult<Car> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;

    // The entity's actual company decides; body overrides cannot widen scope.
    ensure_company_access(&ctx, before.company_id, payload.company_id)?;

    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }

    let car = sqlx::query_as::<_, Car>(
        r#"
        UPDATE cars SET
            brand_id = COALESCE($2, brand_id),
            location_id = COALESCE($3, location_id),
            plate = COALESCE($4, plate),
            model = COALESCE($5, model),
            year = COALESCE($6, year),
            daily_rate = COALESCE($7, daily_rate),
            currency_id = COALESCE($8, currency_id),
            status = COALESCE($9, status)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.brand_id)
    .bind(payload.location_id)
    .bind(payload.plate.as_deref())
    .bind(payload.model.as_deref())
    .bind(payload.year)
    .bind(payload.daily_rate)
    .bind(payload.currency_id)
    .bind(payload.status.as_deref())
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Update,
        "car",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&car).ok(),
    );

    Ok(ApiResponse::success(car))
}

/// DELETE /api/cars/:id - foreign-key violations surface as 409 ("in use").
pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;

    ensure_company_access(&ctx, before.company_id, None)?;

    sqlx::query("DELETE FROM cars WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    audit::record(
        &ctx,
        AuditAction::Delete,
        "car",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
