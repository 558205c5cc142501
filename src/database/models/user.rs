use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::access::Role;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Parse the stored role into the closed enum. The column has a CHECK
    /// constraint, so a parse failure means schema drift.
    pub fn parsed_role(&self) -> Result<Role, String> {
        self.role.parse()
    }
}
