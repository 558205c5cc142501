use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub country: String,
}
