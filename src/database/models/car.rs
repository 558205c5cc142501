use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Car {
    pub id: i64,
    pub company_id: i64,
    pub brand_id: i64,
    pub location_id: Option<i64>,
    pub plate: String,
    pub model: String,
    pub year: i32,
    pub daily_rate: Decimal,
    pub currency_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
