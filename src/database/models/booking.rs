use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub car_id: i64,
    pub client_id: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with its car's owning company, for scope checks.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingWithCompany {
    pub id: i64,
    pub car_id: i64,
    pub client_id: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub company_id: i64,
}
