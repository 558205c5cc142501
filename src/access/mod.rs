pub mod guard;

use serde::{Deserialize, Serialize};

pub use guard::{ensure_company_access, target_company_id};

/// Closed set of platform roles. Owners and managers are bound to exactly one
/// company; admins operate platform-wide; clients are not company-bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Client => "client",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity extracted from the session token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// Derived per-request scope: the role plus the owning company, if any.
/// Never persisted; recomputed on every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub role: Role,
    pub company_id: Option<i64>,
}

/// Ephemeral admin impersonation of a company, carried via query parameters.
/// Only ever populated when the caller's role is admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminMode {
    pub company_id: i64,
}

/// Everything downstream layers need to authorize and audit a request.
/// Built once per request by the context middleware; no ambient state.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user: AuthUser,
    pub scope: Scope,
    pub admin_mode: Option<AdminMode>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Effective company for company-scoped reads and mutations: admin-mode
    /// override first, then the caller's natural scope.
    pub fn effective_company_id(&self) -> Option<i64> {
        self.admin_mode
            .map(|m| m.company_id)
            .or(self.scope.company_id)
    }

    pub fn is_admin(&self) -> bool {
        self.scope.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Owner, Role::Manager, Role::Client] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn admin_mode_overrides_natural_scope() {
        let ctx = RequestContext {
            user: AuthUser {
                id: 1,
                email: "admin@example.com".to_string(),
                role: Role::Admin,
            },
            scope: Scope {
                role: Role::Admin,
                company_id: None,
            },
            admin_mode: Some(AdminMode { company_id: 42 }),
            ip: None,
            user_agent: None,
        };
        assert_eq!(ctx.effective_company_id(), Some(42));
    }
}
