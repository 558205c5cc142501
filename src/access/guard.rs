use crate::error::ApiError;

use super::{RequestContext, Role};

impl RequestContext {
    /// Verify the caller's role is in the permitted set.
    ///
    /// The session middleware has already rejected unauthenticated requests
    /// with 401, so by the time this runs a role mismatch is always 403 -
    /// Unauthorized takes precedence over Forbidden by construction.
    pub fn require_role(&self, permitted: &[Role]) -> Result<(), ApiError> {
        if permitted.contains(&self.scope.role) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user.id,
                role = %self.scope.role,
                "access denied: role not in permitted set"
            );
            Err(ApiError::forbidden("Insufficient role for this operation"))
        }
    }
}

/// Resolve the company a mutation is allowed to touch.
///
/// Precedence: admin-mode company, then the caller's own scope company, then -
/// for an admin with no admin-mode - an explicit company id from the request
/// body. A non-admin caller with no resolvable company gets Forbidden; an
/// admin with no override resolves to `None`, meaning platform-wide access.
pub fn target_company_id(
    ctx: &RequestContext,
    body_company_id: Option<i64>,
) -> Result<Option<i64>, ApiError> {
    if let Some(mode) = ctx.admin_mode {
        return Ok(Some(mode.company_id));
    }
    if let Some(company_id) = ctx.scope.company_id {
        return Ok(Some(company_id));
    }
    if ctx.is_admin() {
        return Ok(body_company_id);
    }
    Err(ApiError::forbidden(
        "No company scope resolved for this account",
    ))
}

/// Reject the request unless the entity's owning company is reachable from
/// the caller's scope. Runs before any mutation executes.
pub fn ensure_company_access(
    ctx: &RequestContext,
    entity_company_id: i64,
    body_company_id: Option<i64>,
) -> Result<(), ApiError> {
    match target_company_id(ctx, body_company_id)? {
        Some(target) if target == entity_company_id => Ok(()),
        // Admin with no admin-mode and no body override: platform-wide.
        None => Ok(()),
        Some(target) => {
            tracing::warn!(
                user_id = ctx.user.id,
                role = %ctx.scope.role,
                target_company = target,
                entity_company = entity_company_id,
                "access denied: company scope mismatch"
            );
            Err(ApiError::forbidden(
                "Entity belongs to a different company",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AdminMode, AuthUser, Scope};

    fn ctx(role: Role, company_id: Option<i64>, admin_mode: Option<i64>) -> RequestContext {
        RequestContext {
            user: AuthUser {
                id: 7,
                email: "user@example.com".to_string(),
                role,
            },
            scope: Scope { role, company_id },
            admin_mode: admin_mode.map(|company_id| AdminMode { company_id }),
            ip: Some("203.0.113.9".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn role_guard_accepts_permitted_roles() {
        let owner = ctx(Role::Owner, Some(7), None);
        assert!(owner.require_role(&[Role::Admin, Role::Owner]).is_ok());
        assert!(owner.require_role(&[Role::Admin]).is_err());
    }

    #[test]
    fn owner_cannot_touch_other_company() {
        let owner = ctx(Role::Owner, Some(7), None);
        assert!(ensure_company_access(&owner, 7, None).is_ok());
        // Body overrides must not widen a non-admin's scope.
        assert!(ensure_company_access(&owner, 8, Some(8)).is_err());
    }

    #[test]
    fn admin_mode_pins_the_target_company() {
        let admin = ctx(Role::Admin, None, Some(42));
        assert!(ensure_company_access(&admin, 42, None).is_ok());
        assert!(ensure_company_access(&admin, 41, None).is_err());
    }

    #[test]
    fn admin_without_mode_uses_body_company_or_passes() {
        let admin = ctx(Role::Admin, None, None);
        // Explicit body target narrows access.
        assert!(ensure_company_access(&admin, 5, Some(5)).is_ok());
        assert!(ensure_company_access(&admin, 6, Some(5)).is_err());
        // No target at all: platform-wide.
        assert!(ensure_company_access(&admin, 6, None).is_ok());
    }

    #[test]
    fn scopeless_non_admin_is_forbidden() {
        let manager = ctx(Role::Manager, None, None);
        let err = target_company_id(&manager, Some(3)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
