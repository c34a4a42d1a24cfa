//! Handler registry mapping job types to executors.

use crate::error::{JobError, JobResult};
use futures::future::BoxFuture;
use mercora_core::TenantId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Async entry point invoked for a job: `(tenant_id, payload) -> result`.
pub type JobHandler =
    Arc<dyn Fn(TenantId, Value) -> BoxFuture<'static, JobResult<Value>> + Send + Sync>;

/// Registry of job handlers.
///
/// An explicit object passed into the dispatcher, never process-wide
/// state, so independent dispatcher instances (and tests) do not share
/// registrations. Registrations are expected to happen at startup;
/// during dispatch the registry is only read.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, JobHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a job type.
    ///
    /// A later registration for the same type silently replaces the
    /// earlier one; last registration wins.
    pub fn register(&self, job_type: impl Into<String>, handler: JobHandler) {
        let job_type = job_type.into();
        self.handlers.write().insert(job_type.clone(), handler);
        info!(job_type = %job_type, "Registered job handler");
    }

    /// Registers an async closure as a handler.
    ///
    /// Sugar over [`Self::register`] so call sites can pass a plain
    /// `async fn(TenantId, Value) -> JobResult<Value>`.
    pub fn register_fn<F, Fut>(&self, job_type: impl Into<String>, handler: F)
    where
        F: Fn(TenantId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<Value>> + Send + 'static,
    {
        let handler: JobHandler = Arc::new(move |tenant, payload| {
            Box::pin(handler(tenant, payload))
        });
        self.register(job_type, handler);
    }

    /// Looks up the handler for a job type.
    #[must_use]
    pub fn get(&self, job_type: &str) -> Option<JobHandler> {
        self.handlers.read().get(job_type).cloned()
    }

    /// Returns the handler or the configuration error the dispatcher
    /// persists when a job's type has no registration.
    pub fn resolve(&self, job_type: &str) -> JobResult<JobHandler> {
        self.get(job_type).ok_or_else(|| {
            JobError::Configuration(format!("no handler registered for type {job_type}"))
        })
    }

    /// Returns the registered type names.
    #[must_use]
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = HandlerRegistry::new();
        registry.register_fn("echo", |_tenant, payload| async move { Ok(payload) });

        let handler = registry.resolve("echo").unwrap();
        let out = handler(TenantId::new(), json!({"k": 1})).await.unwrap();
        assert_eq!(out, json!({"k": 1}));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = HandlerRegistry::new();
        registry.register_fn("greet", |_t, _p| async { Ok(json!("first")) });
        registry.register_fn("greet", |_t, _p| async { Ok(json!("second")) });

        let handler = registry.resolve("greet").unwrap();
        let out = handler(TenantId::new(), json!(null)).await.unwrap();
        assert_eq!(out, json!("second"));
    }

    #[test]
    fn test_resolve_missing_is_configuration_error() {
        let registry = HandlerRegistry::new();
        let Err(err) = registry.resolve("noop") else {
            panic!("expected resolve to fail for an unregistered type");
        };
        assert!(matches!(err, JobError::Configuration(_)));
        assert!(err.to_string().contains("no handler"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = HandlerRegistry::new();
        let b = HandlerRegistry::new();
        a.register_fn("only_in_a", |_t, _p| async { Ok(json!(null)) });
        assert!(a.get("only_in_a").is_some());
        assert!(b.get("only_in_a").is_none());
    }
}
