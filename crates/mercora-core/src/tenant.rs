//! Tenant context threaded through every scoped operation.

use crate::id::TenantId;

/// Per-request tenant context.
///
/// Resolved by the auth middleware (outside this workspace) and passed to
/// every tenant-scoped operation. Carrying the full context rather than a
/// bare id keeps room for request correlation without widening call
/// signatures later.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// The tenant every query is scoped by.
    pub tenant_id: TenantId,

    /// Correlation ID of the originating request, if any.
    pub request_id: Option<String>,
}

impl TenantContext {
    /// Creates a context for a tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            request_id: None,
        }
    }

    /// Attaches a request correlation ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl From<TenantId> for TenantContext {
    fn from(tenant_id: TenantId) -> Self {
        Self::new(tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_tenant_id() {
        let tenant = TenantId::new();
        let ctx = TenantContext::from(tenant);
        assert_eq!(ctx.tenant_id, tenant);
        assert!(ctx.request_id.is_none());
    }

    #[test]
    fn test_context_with_request_id() {
        let ctx = TenantContext::new(TenantId::new()).with_request_id("req-42");
        assert_eq!(ctx.request_id.as_deref(), Some("req-42"));
    }
}
