use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
