use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub currency_id: i64,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Payment joined through booking and car to the owning company.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PaymentWithCompany {
    pub id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub currency_id: i64,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub company_id: i64,
    pub client_id: i64,
}
