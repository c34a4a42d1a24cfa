//! Tenant-scoped queue statistics and retention cleanup.

use crate::error::JobResult;
use crate::job::JobStatus;
use crate::metrics::JobMetrics;
use crate::store::JobStore;
use chrono::{DateTime, Duration, Utc};
use mercora_core::{JobId, TenantContext};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// How far back `recent_failures` looks.
const FAILURE_WINDOW_HOURS: i64 = 24;

/// How many recent failures a stats snapshot carries.
const FAILURE_LIMIT: usize = 10;

/// A point-in-time snapshot of a tenant's queue.
#[derive(Debug, Clone, Serialize)]
pub struct JobStats {
    /// Job counts keyed by status.
    pub by_status: Vec<StatusBucket>,
    /// Job counts keyed by job type.
    pub by_type: Vec<TypeBucket>,
    /// Most recent permanent failures, newest first.
    pub recent_failures: Vec<FailureSummary>,
}

/// A `(status, count)` bucket.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBucket {
    pub status: JobStatus,
    pub count: u64,
}

/// A `(type, count)` bucket.
#[derive(Debug, Clone, Serialize)]
pub struct TypeBucket {
    #[serde(rename = "type")]
    pub job_type: String,
    pub count: u64,
}

/// A failed job, projected down to what a dashboard needs.
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-side statistics over the job store.
pub struct StatsService {
    store: Arc<dyn JobStore>,
}

impl StatsService {
    /// Creates a stats service over a store.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Builds a stats snapshot for the calling tenant.
    pub async fn get_stats(&self, ctx: &TenantContext) -> JobResult<JobStats> {
        let since = Utc::now() - Duration::hours(FAILURE_WINDOW_HOURS);

        let by_status = self
            .store
            .count_by_status(ctx.tenant_id)
            .await?
            .into_iter()
            .map(|row| StatusBucket {
                status: row.status,
                count: row.count,
            })
            .collect();

        let by_type = self
            .store
            .count_by_type(ctx.tenant_id)
            .await?
            .into_iter()
            .map(|row| TypeBucket {
                job_type: row.job_type,
                count: row.count,
            })
            .collect();

        let recent_failures = self
            .store
            .recent_failures(ctx.tenant_id, since, FAILURE_LIMIT)
            .await?
            .into_iter()
            .map(|job| FailureSummary {
                id: job.id,
                job_type: job.job_type,
                error: job.error,
                created_at: job.created_at,
            })
            .collect();

        Ok(JobStats {
            by_status,
            by_type,
            recent_failures,
        })
    }

    /// Deletes terminal jobs older than `retention_days`. Returns how
    /// many rows went away. Cleanup spans all tenants; it is an
    /// operator action, not a tenant one.
    pub async fn cleanup(&self, retention_days: u32) -> JobResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let removed = self.store.delete_terminal_older_than(cutoff).await?;

        if removed > 0 {
            JobMetrics::jobs_cleaned(removed);
            info!(removed, retention_days, "Cleaned up terminal jobs");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;
    use crate::store::{JobTransition, MemoryJobStore};
    use mercora_core::TenantId;
    use serde_json::json;

    async fn seed(store: &dyn JobStore, tenant: TenantId, job_type: &str) -> JobId {
        store
            .create(NewJob::new(job_type, json!({})).into_record(tenant))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_stats_empty_tenant() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let stats = StatsService::new(store);
        let ctx = TenantContext::new(TenantId::new());

        let snapshot = stats.get_stats(&ctx).await.unwrap();
        assert!(snapshot.by_status.is_empty());
        assert!(snapshot.by_type.is_empty());
        assert!(snapshot.recent_failures.is_empty());
    }

    #[tokio::test]
    async fn test_stats_buckets_and_failures() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let tenant = TenantId::new();

        seed(store.as_ref(), tenant, "email").await;
        seed(store.as_ref(), tenant, "email").await;
        let failed = seed(store.as_ref(), tenant, "export").await;
        store
            .update(
                failed,
                JobTransition::Failed {
                    error: "boom".into(),
                },
            )
            .await
            .unwrap();

        // Another tenant's jobs must not leak into the snapshot.
        seed(store.as_ref(), TenantId::new(), "email").await;

        let stats = StatsService::new(Arc::clone(&store));
        let snapshot = stats
            .get_stats(&TenantContext::new(tenant))
            .await
            .unwrap();

        let pending = snapshot
            .by_status
            .iter()
            .find(|b| b.status == JobStatus::Pending)
            .unwrap();
        assert_eq!(pending.count, 2);

        let email = snapshot
            .by_type
            .iter()
            .find(|b| b.job_type == "email")
            .unwrap();
        assert_eq!(email.count, 2);

        assert_eq!(snapshot.recent_failures.len(), 1);
        assert_eq!(snapshot.recent_failures[0].id, failed);
        assert_eq!(snapshot.recent_failures[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_old_terminal_jobs() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let tenant = TenantId::new();

        let mut old = NewJob::new("export", json!({})).into_record(tenant);
        old.created_at = Utc::now() - Duration::days(31);
        old.status = JobStatus::Completed;
        let old = store.create(old).await.unwrap();

        let live = seed(store.as_ref(), tenant, "export").await;

        let stats = StatsService::new(Arc::clone(&store));
        assert_eq!(stats.cleanup(30).await.unwrap(), 1);

        assert!(store.find_one(tenant, old.id).await.is_err());
        assert!(store.find_one(tenant, live).await.is_ok());
    }
}
