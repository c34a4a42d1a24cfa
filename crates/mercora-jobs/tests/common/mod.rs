//! Shared helpers for job engine integration tests.

use mercora_core::{TenantContext, TenantId};
use mercora_jobs::store::{JobStore, MemoryJobStore};
use mercora_jobs::{JobService, JobsConfig};
use std::sync::Arc;

/// A service over an in-memory store, with the store kept reachable so
/// tests can manipulate records directly (for example to pull a retry's
/// `scheduled_at` into the past).
pub struct TestEngine {
    pub service: JobService,
    pub store: Arc<MemoryJobStore>,
    pub ctx: TenantContext,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(JobsConfig::default())
    }

    pub fn with_config(config: JobsConfig) -> Self {
        let store = Arc::new(MemoryJobStore::new());
        let service = JobService::new(store.clone() as Arc<dyn JobStore>, config);
        Self {
            service,
            store,
            ctx: TenantContext::new(TenantId::new()),
        }
    }
}
