use async_trait::async_trait;

use crate::access::RequestContext;
use crate::database::Database;

use super::{AuditAction, NewAuditEntry};

/// Destination for audit rows. A trait seam so the swallow-on-failure
/// behavior is testable without a live database.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn insert(&self, entry: &NewAuditEntry) -> Result<(), String>;
}

/// Default sink: one INSERT into `audit_log`.
pub struct PgAuditSink;

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn insert(&self, entry: &NewAuditEntry) -> Result<(), String> {
        let pool = Database::pool().await.map_err(|e| e.to_string())?;

        sqlx::query(
            r#"
            INSERT INTO audit_log
                (user_id, role, company_id, entity_type, entity_id, action,
                 before_state, after_state, ip, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.role.as_deref())
        .bind(entry.company_id)
        .bind(&entry.entity_type)
        .bind(entry.entity_id.as_deref())
        .bind(entry.action.as_str())
        .bind(entry.before_state.as_ref())
        .bind(entry.after_state.as_ref())
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .execute(&pool)
        .await
        .map_err(|e| e.to_string())?;

        Ok(())
    }
}

/// Append one audit row for an authenticated action, fire-and-forget.
///
/// The insert rides on a spawned task: the primary operation never waits for
/// it and never observes its failure. At-most-once, no retry.
pub fn record(
    ctx: &RequestContext,
    action: AuditAction,
    entity_type: impl Into<String>,
    entity_id: Option<String>,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
) {
    let entry = NewAuditEntry::from_context(ctx, action, entity_type, entity_id)
        .with_states(before_state, after_state);
    record_entry(entry);
}

/// Spawn the insert for an already-built entry (used for anonymous events).
pub fn record_entry(entry: NewAuditEntry) {
    tokio::spawn(async move {
        write_through(&PgAuditSink, &entry).await;
    });
}

/// Insert through the sink, swallowing any failure. The error is logged and
/// nothing else happens - audit logging must never abort the operation it
/// accompanies.
pub async fn write_through(sink: &dyn AuditSink, entry: &NewAuditEntry) {
    if let Err(e) = sink.insert(entry).await {
        tracing::error!(
            entity_type = %entry.entity_type,
            action = %entry.action,
            "audit log write failed (swallowed): {}",
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn insert(&self, _entry: &NewAuditEntry) -> Result<(), String> {
            Err("sink unavailable".to_string())
        }
    }

    struct CountingSink(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl AuditSink for CountingSink {
        async fn insert(&self, _entry: &NewAuditEntry) -> Result<(), String> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    fn entry() -> NewAuditEntry {
        NewAuditEntry::anonymous(
            AuditAction::LoginFailed,
            "user",
            None,
            Some("203.0.113.1".to_string()),
            None,
        )
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        // Must not panic or propagate anything.
        write_through(&FailingSink, &entry()).await;
    }

    #[tokio::test]
    async fn successful_insert_is_attempted_exactly_once() {
        let sink = CountingSink(std::sync::atomic::AtomicUsize::new(0));
        write_through(&sink, &entry()).await;
        assert_eq!(sink.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
