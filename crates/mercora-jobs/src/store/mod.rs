//! Job store contract and implementations.
//!
//! The store is the single source of truth and the sole locking
//! boundary of the engine. Two interchangeable implementations exist:
//! [`MemoryJobStore`] as a fast fake for tests and single-process
//! deployments, and [`PgJobStore`] for durable, restart-surviving
//! queues. Which one a dispatcher runs against is a constructor
//! injection decision, nothing more.

mod memory;
mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

use crate::error::JobResult;
use crate::job::{JobRecord, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercora_core::{Interface, JobId, PageRequest, TenantId};
use serde_json::Value;

/// Status-changing update applied atomically by the store.
///
/// Encoding the target status together with its fields makes an
/// inconsistent write (say, a `result` on a failed job) unrepresentable.
#[derive(Debug, Clone)]
pub enum JobTransition {
    /// Handler succeeded: terminal, records the result.
    Completed {
        completed_at: DateTime<Utc>,
        result: Option<Value>,
    },

    /// Transient failure with attempts left: back to `Pending`, eligible
    /// again once `scheduled_at` passes.
    Rescheduled {
        error: String,
        scheduled_at: DateTime<Utc>,
    },

    /// Attempts exhausted or no handler registered: terminal.
    Failed { error: String },

    /// Admin cancellation of a pending job: terminal.
    Cancelled,

    /// Manual retry of a failed job: back to `Pending` with attempts
    /// reset to 0, error and schedule cleared.
    Reset,
}

impl JobTransition {
    /// The status this transition moves the job into.
    #[must_use]
    pub const fn target_status(&self) -> JobStatus {
        match self {
            Self::Completed { .. } => JobStatus::Completed,
            Self::Rescheduled { .. } | Self::Reset => JobStatus::Pending,
            Self::Failed { .. } => JobStatus::Failed,
            Self::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// Filters for listing a tenant's jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Only jobs in this status.
    pub status: Option<JobStatus>,
    /// Only jobs of this type.
    pub job_type: Option<String>,
}

impl JobFilter {
    /// Filter by status.
    #[must_use]
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by job type.
    #[must_use]
    pub fn job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = Some(job_type.into());
        self
    }
}

/// A `(status, count)` aggregation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: u64,
}

/// A `(type, count)` aggregation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCount {
    pub job_type: String,
    pub count: u64,
}

/// Durable CRUD over job records.
///
/// `claim` is the one concurrency primitive the engine relies on across
/// processes: an atomic conditional status update. Everything else is
/// plain reads and writes.
#[async_trait]
pub trait JobStore: Interface {
    /// Persists a new job record.
    async fn create(&self, record: JobRecord) -> JobResult<JobRecord>;

    /// Lists a tenant's jobs matching the filter, ordered by priority
    /// descending then creation time descending. Returns the page slice
    /// and the total match count.
    async fn find_many(
        &self,
        tenant_id: TenantId,
        filter: &JobFilter,
        page: PageRequest,
    ) -> JobResult<(Vec<JobRecord>, u64)>;

    /// Fetches a single job scoped to the tenant.
    ///
    /// Fails with `NotFound` when the id is unknown or belongs to a
    /// different tenant; the two cases are indistinguishable on purpose.
    async fn find_one(&self, tenant_id: TenantId, id: JobId) -> JobResult<JobRecord>;

    /// Jobs due for dispatch at `now`: pending, and either unscheduled or
    /// scheduled at or before `now`. Ordered by priority descending then
    /// creation time ascending (FIFO within a priority band). Spans all
    /// tenants; dispatch is a platform concern.
    async fn list_due(&self, now: DateTime<Utc>, batch_size: usize) -> JobResult<Vec<JobRecord>>;

    /// Atomically transitions `Pending -> Running`, stamping `started_at`
    /// and incrementing `attempts`. Returns false when the job was not
    /// pending, meaning another dispatcher won the race.
    async fn claim(&self, id: JobId) -> JobResult<bool>;

    /// Applies a status transition and its fields atomically.
    async fn update(&self, id: JobId, transition: JobTransition) -> JobResult<()>;

    /// Deletes terminal jobs created before `cutoff`; returns the count.
    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> JobResult<u64>;

    /// Job counts grouped by status for a tenant.
    async fn count_by_status(&self, tenant_id: TenantId) -> JobResult<Vec<StatusCount>>;

    /// Job counts grouped by type for a tenant.
    async fn count_by_type(&self, tenant_id: TenantId) -> JobResult<Vec<TypeCount>>;

    /// Most recent failed jobs created at or after `since`, newest first.
    async fn recent_failures(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> JobResult<Vec<JobRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_target_status() {
        assert_eq!(
            JobTransition::Completed {
                completed_at: Utc::now(),
                result: None
            }
            .target_status(),
            JobStatus::Completed
        );
        assert_eq!(
            JobTransition::Rescheduled {
                error: "boom".into(),
                scheduled_at: Utc::now()
            }
            .target_status(),
            JobStatus::Pending
        );
        assert_eq!(
            JobTransition::Failed { error: "boom".into() }.target_status(),
            JobStatus::Failed
        );
        assert_eq!(JobTransition::Cancelled.target_status(), JobStatus::Cancelled);
        assert_eq!(JobTransition::Reset.target_status(), JobStatus::Pending);
    }

    #[test]
    fn test_filter_builder() {
        let filter = JobFilter::default()
            .status(JobStatus::Failed)
            .job_type("marketplace_sync");
        assert_eq!(filter.status, Some(JobStatus::Failed));
        assert_eq!(filter.job_type.as_deref(), Some("marketplace_sync"));
    }
}
