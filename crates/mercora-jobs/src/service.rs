//! The job engine facade.
//!
//! `JobService` wires the store, handler registry, dispatcher and stats
//! reader together behind one tenant-aware API. Callers hold one of
//! these; the parts underneath stay internal.

use crate::config::JobsConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{JobError, JobResult};
use crate::job::{JobRecord, JobStatus, NewJob};
use crate::metrics::JobMetrics;
use crate::registry::{HandlerRegistry, JobHandler};
use crate::stats::{JobStats, StatsService};
use crate::store::{JobFilter, JobStore, JobTransition};
use mercora_core::{JobId, Page, PageRequest, TenantContext, TenantId};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Tenant-aware entry point to the job engine.
pub struct JobService {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    dispatcher: Dispatcher,
    stats: StatsService,
    config: JobsConfig,
}

impl JobService {
    /// Creates a service over a store with the given configuration.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, config: JobsConfig) -> Self {
        let registry = Arc::new(HandlerRegistry::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            config.retry_policy(),
        );
        let stats = StatsService::new(Arc::clone(&store));
        Self {
            store,
            registry,
            dispatcher,
            stats,
            config,
        }
    }

    /// Registers a handler for a job type. Re-registering a type
    /// replaces the previous handler.
    pub fn register_handler(&self, job_type: impl Into<String>, handler: JobHandler) {
        self.registry.register(job_type, handler);
    }

    /// Registers an async closure as a handler for a job type.
    pub fn register_handler_fn<F, Fut>(&self, job_type: impl Into<String>, handler: F)
    where
        F: Fn(TenantId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<Value>> + Send + 'static,
    {
        self.registry.register_fn(job_type, handler);
    }

    /// Creates a job for the calling tenant.
    pub async fn create_job(&self, ctx: &TenantContext, new_job: NewJob) -> JobResult<JobRecord> {
        if new_job.job_type.trim().is_empty() {
            return Err(JobError::Configuration(
                "job type must not be empty".into(),
            ));
        }

        // Jobs that do not set their own budget get the configured one.
        let new_job = match new_job.max_attempts {
            Some(_) => new_job,
            None => new_job.max_attempts(self.config.default_max_attempts),
        };

        let record = new_job.into_record(ctx.tenant_id);
        let record = self.store.create(record).await?;

        JobMetrics::job_created(&record.job_type);
        info!(
            job_id = %record.id,
            tenant_id = %record.tenant_id,
            job_type = %record.job_type,
            "Job created"
        );
        Ok(record)
    }

    /// Lists the tenant's jobs, newest first within priority, with
    /// optional status and type filters.
    pub async fn find_jobs(
        &self,
        ctx: &TenantContext,
        filter: &JobFilter,
        page: PageRequest,
    ) -> JobResult<Page<JobRecord>> {
        let (items, total) = self.store.find_many(ctx.tenant_id, filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Fetches one of the tenant's jobs by id.
    pub async fn find_job(&self, ctx: &TenantContext, id: JobId) -> JobResult<JobRecord> {
        self.store.find_one(ctx.tenant_id, id).await
    }

    /// Cancels a pending job. Any other status is rejected so a running
    /// or finished job can never be yanked out from under its handler.
    pub async fn cancel_job(&self, ctx: &TenantContext, id: JobId) -> JobResult<JobRecord> {
        let job = self.store.find_one(ctx.tenant_id, id).await?;
        if job.status != JobStatus::Pending {
            return Err(JobError::invalid_state("cancel", job.status));
        }

        self.store.update(id, JobTransition::Cancelled).await?;
        JobMetrics::job_cancelled(&job.job_type);
        info!(job_id = %id, "Job cancelled");

        self.store.find_one(ctx.tenant_id, id).await
    }

    /// Resets a failed job back to pending with a fresh attempt budget.
    /// Only `Failed` jobs qualify.
    pub async fn retry_job(&self, ctx: &TenantContext, id: JobId) -> JobResult<JobRecord> {
        let job = self.store.find_one(ctx.tenant_id, id).await?;
        if job.status != JobStatus::Failed {
            return Err(JobError::invalid_state("retry", job.status));
        }

        self.store.update(id, JobTransition::Reset).await?;
        info!(job_id = %id, job_type = %job.job_type, "Job reset for retry");

        self.store.find_one(ctx.tenant_id, id).await
    }

    /// Runs one dispatch tick over due jobs from every tenant. Returns
    /// how many jobs the tick claimed. Never fails: a store outage is
    /// logged and counts as an empty tick.
    pub async fn process_pending_jobs(&self) -> usize {
        self.dispatcher
            .process_pending_jobs(self.config.batch_size)
            .await
    }

    /// Builds a stats snapshot for the calling tenant.
    pub async fn get_stats(&self, ctx: &TenantContext) -> JobResult<JobStats> {
        self.stats.get_stats(ctx).await
    }

    /// Deletes terminal jobs older than the configured retention.
    pub async fn cleanup(&self) -> JobResult<u64> {
        self.stats.cleanup(self.config.retention_days).await
    }
}
