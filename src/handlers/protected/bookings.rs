use axum::extract::{Extension, Path, Query};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::access::{ensure_company_access, target_company_id, RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::database::{
    models::{Booking, BookingWithCompany},
    Database, Repository,
};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const BOOKING_COLUMNS: &[&str] = &[
    "car_id",
    "client_id",
    "starts_on",
    "ends_on",
    "status",
    "created_at",
];

static BOOKINGS: Repository<Booking> = Repository::new("bookings", BOOKING_COLUMNS);

const WITH_COMPANY_SQL: &str = r#"
    SELECT b.id, b.car_id, b.client_id, b.starts_on, b.ends_on, b.status,
           b.created_at, c.company_id
    FROM bookings b
    JOIN cars c ON c.id = b.car_id
    WHERE b.id = $1
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub car_id: i64,
    /// Ignored for clients, who always book for themselves.
    pub client_id: Option<i64>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBooking {
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub status: Option<String>,
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    match status {
        "pending" | "active" | "completed" | "cancelled" => Ok(()),
        other => Err(ApiError::bad_request(format!(
            "unknown booking status: {}",
            other
        ))),
    }
}

async fn fetch_with_company(id: i64) -> Result<BookingWithCompany, ApiError> {
    let pool = Database::pool().await?;
    sqlx::query_as::<_, BookingWithCompany>(WITH_COMPANY_SQL)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

/// Clients only ever see their own bookings; company accounts see their
/// company's, resolved through the booked car.
fn check_read_access(ctx: &RequestContext, booking: &BookingWithCompany) -> Result<(), ApiError> {
    if ctx.scope.role == Role::Client {
        if booking.client_id == ctx.user.id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Booking belongs to another client"))
        }
    } else {
        ensure_company_access(ctx, booking.company_id, None)
    }
}

/// GET /api/bookings
pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Booking>> {
    let pool = Database::pool().await?;

    let mut query = BOOKINGS.query()?;
    if ctx.scope.role == Role::Client {
        query = query.and_eq("client_id", json!(ctx.user.id));
    } else if let Some(company_id) = target_company_id(&ctx, None)? {
        query = query.and_raw(
            "\"car_id\" IN (SELECT id FROM cars WHERE company_id = $?)",
            json!(company_id),
        );
    }

    let (bookings, total) = BOOKINGS.page(&pool, query, &params).await?;
    Ok(ApiResponse::paginated(
        bookings,
        Pagination::new(&params, total),
    ))
}

/// GET /api/bookings/:id
pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<BookingWithCompany> {
    let booking = fetch_with_company(id).await?;
    check_read_access(&ctx, &booking)?;
    Ok(ApiResponse::success(booking))
}

/// POST /api/bookings - clients book for themselves from any company's
/// fleet; company accounts create bookings for their own cars.
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CreateBooking>,
) -> ApiResult<Booking> {
    if payload.ends_on < payload.starts_on {
        return Err(ApiError::bad_request("endsOn must not precede startsOn"));
    }

    let pool = Database::pool().await?;
    let car_company = sqlx::query_scalar::<_, i64>("SELECT company_id FROM cars WHERE id = $1")
        .bind(payload.car_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;

    let client_id = if ctx.scope.role == Role::Client {
        ctx.user.id
    } else {
        ensure_company_access(&ctx, car_company, None)?;
        payload
            .client_id
            .ok_or_else(|| ApiError::bad_request("clientId is required"))?
    };

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (car_id, client_id, starts_on, ends_on, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING *
        "#,
    )
    .bind(payload.car_id)
    .bind(client_id)
    .bind(payload.starts_on)
    .bind(payload.ends_on)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Create,
        "booking",
        Some(booking.id.to_string()),
        None,
        serde_json::to_value(&booking).ok(),
    );

    Ok(ApiResponse::created(booking))
}

/// PUT /api/bookings/:id
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<UpdateBooking>,
) -> ApiResult<Booking> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let before = fetch_with_company(id).await?;
    ensure_company_access(&ctx, before.company_id, None)?;

    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }

    let pool = Database::pool().await?;
    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings SET
            starts_on = COALESCE($2, starts_on),
            ends_on = COALESCE($3, ends_on),
            status = COALESCE($4, status)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.starts_on)
    .bind(payload.ends_on)
    .bind(payload.status.as_deref())
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Update,
        "booking",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&booking).ok(),
    );

    Ok(ApiResponse::success(booking))
}

/// DELETE /api/bookings/:id
pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let before = fetch_with_company(id).await?;
    ensure_company_access(&ctx, before.company_id, None)?;

    let pool = Database::pool().await?;
    sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    audit::record(
        &ctx,
        AuditAction::Delete,
        "booking",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
