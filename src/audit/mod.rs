pub mod logger;

use serde_json::Value;

use crate::access::RequestContext;

pub use logger::{record, record_entry, AuditSink, PgAuditSink};

/// Closed set of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    LoginFailed,
    Logout,
    View,
    Correct,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::View => "view",
            AuditAction::Correct => "correct",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit row, ready to insert. Actor and request metadata are resolved
/// from the request context when built through [`NewAuditEntry::from_context`].
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub role: Option<String>,
    pub company_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub action: AuditAction,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    pub fn from_context(
        ctx: &RequestContext,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
    ) -> Self {
        Self {
            user_id: Some(ctx.user.id),
            role: Some(ctx.scope.role.as_str().to_string()),
            company_id: ctx.effective_company_id(),
            entity_type: entity_type.into(),
            entity_id,
            action,
            before_state: None,
            after_state: None,
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
        }
    }

    /// Entry for unauthenticated events (failed logins).
    pub fn anonymous(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: Option<String>,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            user_id: None,
            role: None,
            company_id: None,
            entity_type: entity_type.into(),
            entity_id,
            action,
            before_state: None,
            after_state: None,
            ip,
            user_agent,
        }
    }

    pub fn with_states(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        self.before_state = before;
        self.after_state = after;
        self
    }
}
