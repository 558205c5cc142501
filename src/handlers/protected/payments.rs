use axum::extract::{Extension, Path, Query};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::access::{ensure_company_access, target_company_id, RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::database::{
    models::{Payment, PaymentWithCompany},
    Database, Repository,
};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const PAYMENT_COLUMNS: &[&str] = &[
    "booking_id",
    "amount",
    "currency_id",
    "status",
    "paid_at",
    "created_at",
];

static PAYMENTS: Repository<Payment> = Repository::new("payments", PAYMENT_COLUMNS);

const WITH_COMPANY_SQL: &str = r#"
    SELECT p.id, p.booking_id, p.amount, p.currency_id, p.status, p.paid_at,
           p.created_at, c.company_id, b.client_id
    FROM payments p
    JOIN bookings b ON b.id = p.booking_id
    JOIN cars c ON c.id = b.car_id
    WHERE p.id = $1
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub booking_id: i64,
    pub amount: Decimal,
    pub currency_id: i64,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayment {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectPayment {
    pub amount: Option<Decimal>,
    pub currency_id: Option<i64>,
    pub status: Option<String>,
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    match status {
        "pending" | "paid" | "refunded" => Ok(()),
        other => Err(ApiError::bad_request(format!(
            "unknown payment status: {}",
            other
        ))),
    }
}

async fn fetch_with_company(id: i64) -> Result<PaymentWithCompany, ApiError> {
    let pool = Database::pool().await?;
    sqlx::query_as::<_, PaymentWithCompany>(WITH_COMPANY_SQL)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment not found"))
}

/// GET /api/payments
pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Payment>> {
    let pool = Database::pool().await?;

    let mut query = PAYMENTS.query()?;
    if ctx.scope.role == Role::Client {
        query = query.and_raw(
            "\"booking_id\" IN (SELECT id FROM bookings WHERE client_id = $?)",
            json!(ctx.user.id),
        );
    } else if let Some(company_id) = target_company_id(&ctx, None)? {
        query = query.and_raw(
            "\"booking_id\" IN (SELECT b.id FROM bookings b JOIN cars c ON c.id = b.car_id WHERE c.company_id = $?)",
            json!(company_id),
        );
    }

    let (payments, total) = PAYMENTS.page(&pool, query, &params).await?;
    Ok(ApiResponse::paginated(
        payments,
        Pagination::new(&params, total),
    ))
}

/// GET /api/payments/:id
pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<PaymentWithCompany> {
    let payment = fetch_with_company(id).await?;

    if ctx.scope.role == Role::Client {
        if payment.client_id != ctx.user.id {
            return Err(ApiError::forbidden("Payment belongs to another client"));
        }
    } else {
        ensure_company_access(&ctx, payment.company_id, None)?;
    }

    Ok(ApiResponse::success(payment))
}

/// POST /api/payments
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CreatePayment>,
) -> ApiResult<Payment> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let pool = Database::pool().await?;
    let booking_company = sqlx::query_scalar::<_, i64>(
        "SELECT c.company_id FROM bookings b JOIN cars c ON c.id = b.car_id WHERE b.id = $1",
    )
    .bind(payload.booking_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    ensure_company_access(&ctx, booking_company, None)?;

    let status = payload.status.unwrap_or_else(|| "pending".to_string());
    validate_status(&status)?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (booking_id, amount, currency_id, status, paid_at)
        VALUES ($1, $2, $3, $4, CASE WHEN $4 = 'paid' THEN now() END)
        RETURNING *
        "#,
    )
    .bind(payload.booking_id)
    .bind(payload.amount)
    .bind(payload.currency_id)
    .bind(&status)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Create,
        "payment",
        Some(payment.id.to_string()),
        None,
        serde_json::to_value(&payment).ok(),
    );

    Ok(ApiResponse::created(payment))
}

/// PUT /api/payments/:id - status transitions; `paid_at` tracks the move to
/// `paid`.
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<UpdatePayment>,
) -> ApiResult<Payment> {
    ctx.require_role(&[Role::Admin, Role::Owner, Role::Manager])?;

    let before = fetch_with_company(id).await?;
    ensure_company_access(&ctx, before.company_id, None)?;

    let status = payload
        .status
        .ok_or_else(|| ApiError::bad_request("status is required"))?;
    validate_status(&status)?;

    let pool = Database::pool().await?;
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments SET
            status = $2,
            paid_at = CASE WHEN $2 = 'paid' AND paid_at IS NULL THEN now() ELSE paid_at END
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&status)
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Update,
        "payment",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&payment).ok(),
    );

    Ok(ApiResponse::success(payment))
}

/// PATCH /api/payments/:id/correct - billing correction by an owner or
/// admin, audited as `correct` with full before/after snapshots.
pub async fn correct(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<CorrectPayment>,
) -> ApiResult<Payment> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    let before = fetch_with_company(id).await?;
    ensure_company_access(&ctx, before.company_id, None)?;

    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }

    let pool = Database::pool().await?;
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments SET
            amount = COALESCE($2, amount),
            currency_id = COALESCE($3, currency_id),
            status = COALESCE($4, status)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.amount)
    .bind(payload.currency_id)
    .bind(payload.status.as_deref())
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Correct,
        "payment",
        Some(id.to_string()),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&payment).ok(),
    );

    Ok(ApiResponse::success(payment))
}
