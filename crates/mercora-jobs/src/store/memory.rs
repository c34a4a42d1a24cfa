//! In-memory job store.

use super::{JobFilter, JobStore, JobTransition, StatusCount, TypeCount};
use crate::error::{JobError, JobResult};
use crate::job::{JobRecord, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercora_core::{JobId, PageRequest, TenantId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory [`JobStore`].
///
/// The fast fake for tests and single-process deployments. All
/// operations run under one mutex, so `claim` is a compare-and-set with
/// the same atomicity the durable store gets from a conditional UPDATE.
/// Nothing survives a restart.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: JobRecord) -> JobResult<JobRecord> {
        self.jobs.lock().insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_many(
        &self,
        tenant_id: TenantId,
        filter: &JobFilter,
        page: PageRequest,
    ) -> JobResult<(Vec<JobRecord>, u64)> {
        let jobs = self.jobs.lock();
        let mut matching: Vec<JobRecord> = jobs
            .values()
            .filter(|j| j.tenant_id == tenant_id)
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .filter(|j| {
                filter
                    .job_type
                    .as_deref()
                    .map_or(true, |t| j.job_type == t)
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = matching.len() as u64;
        let items: Vec<JobRecord> = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();

        Ok((items, total))
    }

    async fn find_one(&self, tenant_id: TenantId, id: JobId) -> JobResult<JobRecord> {
        self.jobs
            .lock()
            .get(&id)
            .filter(|j| j.tenant_id == tenant_id)
            .cloned()
            .ok_or(JobError::NotFound(id))
    }

    async fn list_due(&self, now: DateTime<Utc>, batch_size: usize) -> JobResult<Vec<JobRecord>> {
        let jobs = self.jobs.lock();
        let mut due: Vec<JobRecord> = jobs.values().filter(|j| j.is_due(now)).cloned().collect();

        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        due.truncate(batch_size);

        Ok(due)
    }

    async fn claim(&self, id: JobId) -> JobResult<bool> {
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                job.attempts += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    async fn update(&self, id: JobId, transition: JobTransition) -> JobResult<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;

        job.status = transition.target_status();
        match transition {
            JobTransition::Completed {
                completed_at,
                result,
            } => {
                job.completed_at = Some(completed_at);
                job.result = result;
            }
            JobTransition::Rescheduled {
                error,
                scheduled_at,
            } => {
                job.error = Some(error);
                job.scheduled_at = Some(scheduled_at);
            }
            JobTransition::Failed { error } => {
                job.error = Some(error);
            }
            JobTransition::Cancelled => {}
            JobTransition::Reset => {
                job.attempts = 0;
                job.error = None;
                job.scheduled_at = None;
            }
        }

        Ok(())
    }

    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> JobResult<u64> {
        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|_, j| !(j.status.is_terminal() && j.created_at < cutoff));
        Ok((before - jobs.len()) as u64)
    }

    async fn count_by_status(&self, tenant_id: TenantId) -> JobResult<Vec<StatusCount>> {
        let jobs = self.jobs.lock();
        let mut counts: HashMap<JobStatus, u64> = HashMap::new();
        for job in jobs.values().filter(|j| j.tenant_id == tenant_id) {
            *counts.entry(job.status).or_default() += 1;
        }

        let mut rows: Vec<StatusCount> = counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        rows.sort_by_key(|r| r.status.as_str());
        Ok(rows)
    }

    async fn count_by_type(&self, tenant_id: TenantId) -> JobResult<Vec<TypeCount>> {
        let jobs = self.jobs.lock();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for job in jobs.values().filter(|j| j.tenant_id == tenant_id) {
            *counts.entry(job.job_type.clone()).or_default() += 1;
        }

        let mut rows: Vec<TypeCount> = counts
            .into_iter()
            .map(|(job_type, count)| TypeCount { job_type, count })
            .collect();
        rows.sort_by(|a, b| a.job_type.cmp(&b.job_type));
        Ok(rows)
    }

    async fn recent_failures(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> JobResult<Vec<JobRecord>> {
        let jobs = self.jobs.lock();
        let mut failed: Vec<JobRecord> = jobs
            .values()
            .filter(|j| {
                j.tenant_id == tenant_id
                    && j.status == JobStatus::Failed
                    && j.created_at >= since
            })
            .cloned()
            .collect();

        failed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        failed.truncate(limit);
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;
    use chrono::Duration;
    use serde_json::json;

    fn record(tenant: TenantId, job_type: &str) -> JobRecord {
        NewJob::new(job_type, json!({})).into_record(tenant)
    }

    #[tokio::test]
    async fn test_claim_is_conditional() {
        let store = MemoryJobStore::new();
        let job = store
            .create(record(TenantId::new(), "sync"))
            .await
            .unwrap();

        assert!(store.claim(job.id).await.unwrap());
        // Second claim loses: the job is running now.
        assert!(!store.claim(job.id).await.unwrap());

        let stored = store.find_one(job.tenant_id, job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Running);
        assert_eq!(stored.attempts, 1);
        assert!(stored.started_at.is_some());
    }

    #[tokio::test]
    async fn test_claim_unknown_id_returns_false() {
        let store = MemoryJobStore::new();
        assert!(!store.claim(JobId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_one_is_tenant_scoped() {
        let store = MemoryJobStore::new();
        let job = store
            .create(record(TenantId::new(), "sync"))
            .await
            .unwrap();

        let err = store.find_one(TenantId::new(), job.id).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(id) if id == job.id));
    }

    #[tokio::test]
    async fn test_list_due_ordering_and_schedule() {
        let store = MemoryJobStore::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let mut low = record(tenant, "low");
        low.created_at = now - Duration::seconds(30);
        let mut high = record(tenant, "high");
        high.priority = 10;
        high.created_at = now - Duration::seconds(10);
        let mut future = record(tenant, "future");
        future.scheduled_at = Some(now + Duration::minutes(5));

        store.create(low.clone()).await.unwrap();
        store.create(high.clone()).await.unwrap();
        store.create(future).await.unwrap();

        let due = store.list_due(now, 10).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, high.id);
        assert_eq!(due[1].id, low.id);
    }

    #[tokio::test]
    async fn test_list_due_fifo_within_priority_band() {
        let store = MemoryJobStore::new();
        let tenant = TenantId::new();
        let now = Utc::now();

        let mut older = record(tenant, "a");
        older.created_at = now - Duration::seconds(60);
        let mut newer = record(tenant, "b");
        newer.created_at = now - Duration::seconds(5);

        store.create(newer.clone()).await.unwrap();
        store.create(older.clone()).await.unwrap();

        let due = store.list_due(now, 10).await.unwrap();
        assert_eq!(due[0].id, older.id);
        assert_eq!(due[1].id, newer.id);
    }

    #[tokio::test]
    async fn test_find_many_filters_and_pagination() {
        let store = MemoryJobStore::new();
        let tenant = TenantId::new();
        for i in 0..5 {
            let mut r = record(tenant, if i % 2 == 0 { "even" } else { "odd" });
            r.created_at = Utc::now() - Duration::seconds(i);
            store.create(r).await.unwrap();
        }

        let (all, total) = store
            .find_many(tenant, &JobFilter::default(), PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(total, 5);

        let (evens, total) = store
            .find_many(
                tenant,
                &JobFilter::default().job_type("even"),
                PageRequest::first(),
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(evens.iter().all(|j| j.job_type == "even"));
    }

    #[tokio::test]
    async fn test_reset_clears_error_and_schedule() {
        let store = MemoryJobStore::new();
        let job = store
            .create(record(TenantId::new(), "sync"))
            .await
            .unwrap();

        store.claim(job.id).await.unwrap();
        store
            .update(job.id, JobTransition::Failed { error: "boom".into() })
            .await
            .unwrap();
        store.update(job.id, JobTransition::Reset).await.unwrap();

        let stored = store.find_one(job.tenant_id, job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.attempts, 0);
        assert!(stored.error.is_none());
        assert!(stored.scheduled_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_terminal_spares_live_jobs() {
        let store = MemoryJobStore::new();
        let tenant = TenantId::new();
        let old = Utc::now() - Duration::days(10);

        let mut done = record(tenant, "done");
        done.status = JobStatus::Completed;
        done.created_at = old;
        let mut pending = record(tenant, "pending");
        pending.created_at = old;

        store.create(done).await.unwrap();
        store.create(pending.clone()).await.unwrap();

        let deleted = store
            .delete_terminal_older_than(Utc::now() - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_one(tenant, pending.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_counts_scoped_to_tenant() {
        let store = MemoryJobStore::new();
        let tenant = TenantId::new();
        store.create(record(tenant, "sync")).await.unwrap();
        store.create(record(TenantId::new(), "sync")).await.unwrap();

        let by_status = store.count_by_status(tenant).await.unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].count, 1);

        let by_type = store.count_by_type(tenant).await.unwrap();
        assert_eq!(by_type, vec![TypeCount { job_type: "sync".into(), count: 1 }]);
    }
}
