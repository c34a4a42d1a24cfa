//! Mercora Jobs - Tenant-Scoped Background Job Engine
//!
//! A database-backed job engine with:
//! - Per-tenant job isolation on every read path
//! - Atomic claim semantics safe across multiple dispatcher processes
//! - Retry with exponential backoff and a fixed attempt budget
//! - Last-wins handler registration keyed by job type
//! - Priority ordering with FIFO within a priority
//! - Queue statistics and terminal-job retention cleanup
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      JobService                          │
//! │  create / cancel / retry / stats / process_pending_jobs  │
//! └───────┬──────────────────┬──────────────────┬────────────┘
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//!  ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │  JobStore   │   │  Dispatcher  │   │ StatsService │
//!  │ (memory/pg) │◄──┤ claim + run  │   │ counts, fails│
//!  └─────────────┘   └──────┬───────┘   └──────────────┘
//!                           │
//!                           ▼
//!                  ┌─────────────────┐
//!                  │ HandlerRegistry │
//!                  │  type → async fn │
//!                  └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use mercora_jobs::{JobService, JobsConfig, NewJob};
//! use mercora_jobs::store::MemoryJobStore;
//! use mercora_core::TenantContext;
//! use std::sync::Arc;
//!
//! let service = JobService::new(Arc::new(MemoryJobStore::new()), JobsConfig::default());
//!
//! service.register_handler_fn("send_email", |_tenant, payload| async move {
//!     // send the email
//!     Ok(serde_json::json!({ "sent": true }))
//! });
//!
//! let ctx = TenantContext::new(tenant_id);
//! service.create_job(&ctx, NewJob::new("send_email", payload)).await?;
//!
//! // Usually called from a polling loop.
//! service.process_pending_jobs().await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod metrics;
pub mod registry;
pub mod retry;
pub mod service;
pub mod stats;
pub mod store;

pub use config::JobsConfig;
pub use dispatcher::Dispatcher;
pub use error::{JobError, JobResult};
pub use job::{JobRecord, JobStatus, NewJob, DEFAULT_MAX_ATTEMPTS};
pub use metrics::{register_metrics, DispatcherMetrics, JobMetrics};
pub use registry::{HandlerRegistry, JobHandler};
pub use retry::RetryPolicy;
pub use service::JobService;
pub use stats::{FailureSummary, JobStats, StatsService, StatusBucket, TypeBucket};
pub use store::{
    JobFilter, JobStore, JobTransition, MemoryJobStore, PgJobStore, StatusCount, TypeCount,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::job::{JobRecord, JobStatus, NewJob};
    pub use crate::store::{JobFilter, JobStore};
    pub use crate::{JobError, JobResult, JobService, JobsConfig};
    pub use mercora_core::{JobId, TenantContext, TenantId};
}
