use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// Persisted audit row. Append-only; rows are never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub role: Option<String>,
    pub company_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub action: String,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
