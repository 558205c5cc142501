use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Currency {
    pub id: i64,
    pub code: String,
    pub name: String,
}
