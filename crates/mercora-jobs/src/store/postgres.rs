//! PostgreSQL job store implementation.

use super::{JobFilter, JobStore, JobTransition, StatusCount, TypeCount};
use crate::error::{JobError, JobResult};
use crate::job::{JobRecord, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercora_core::{JobId, PageRequest, TenantId};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed [`JobStore`].
///
/// `claim` relies on a conditional `UPDATE ... WHERE status = 'pending'`
/// with an affected-row check, which is what makes running multiple
/// dispatcher processes against the same database safe. The table DDL
/// lives in `schema.sql` next to this crate.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a job.
#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    tenant_id: Uuid,
    job_type: String,
    payload: Value,
    status: String,
    priority: i32,
    attempts: i32,
    max_attempts: i32,
    error: Option<String>,
    result: Option<Value>,
    scheduled_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = JobError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e: String| JobError::Store(format!("invalid row: {e}")))?;

        Ok(JobRecord {
            id: JobId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            job_type: row.job_type,
            payload: row.payload,
            status,
            priority: row.priority,
            attempts: row.attempts.max(0) as u32,
            max_attempts: row.max_attempts.max(0) as u32,
            error: row.error,
            result: row.result,
            scheduled_at: row.scheduled_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"id, tenant_id, "type" AS job_type, payload, status, priority,
       attempts, max_attempts, error, result, scheduled_at, started_at,
       completed_at, created_at"#;

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, record: JobRecord) -> JobResult<JobRecord> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, tenant_id, "type", payload, status, priority,
                              attempts, max_attempts, error, result,
                              scheduled_at, started_at, completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(record.id.into_inner())
        .bind(record.tenant_id.into_inner())
        .bind(&record.job_type)
        .bind(&record.payload)
        .bind(record.status.as_str())
        .bind(record.priority)
        .bind(record.attempts as i32)
        .bind(record.max_attempts as i32)
        .bind(&record.error)
        .bind(&record.result)
        .bind(record.scheduled_at)
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(job_id = %record.id, job_type = %record.job_type, "Persisted job");
        Ok(record)
    }

    async fn find_many(
        &self,
        tenant_id: TenantId,
        filter: &JobFilter,
        page: PageRequest,
    ) -> JobResult<(Vec<JobRecord>, u64)> {
        let status = filter.status.map(|s| s.as_str());
        let job_type = filter.job_type.as_deref();

        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM jobs
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR "type" = $3)
            ORDER BY priority DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(tenant_id.into_inner())
        .bind(status)
        .bind(job_type)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM jobs
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR "type" = $3)
            "#,
        )
        .bind(tenant_id.into_inner())
        .bind(status)
        .bind(job_type)
        .fetch_one(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(JobRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total.max(0) as u64))
    }

    async fn find_one(&self, tenant_id: TenantId, id: JobId) -> JobResult<JobRecord> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM jobs
            WHERE id = $1 AND tenant_id = $2
            "#
        ))
        .bind(id.into_inner())
        .bind(tenant_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRecord::try_from)
            .transpose()?
            .ok_or(JobError::NotFound(id))
    }

    async fn list_due(&self, now: DateTime<Utc>, batch_size: usize) -> JobResult<Vec<JobRecord>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM jobs
            WHERE status = 'pending'
              AND (scheduled_at IS NULL OR scheduled_at <= $1)
            ORDER BY priority DESC, created_at ASC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(batch_size as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn claim(&self, id: JobId) -> JobResult<bool> {
        // The cross-process gate: a single conditional update. Losing the
        // race means another dispatcher already has the job.
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'running', started_at = $2, attempts = attempts + 1
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.into_inner())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, id: JobId, transition: JobTransition) -> JobResult<()> {
        let result = match transition {
            JobTransition::Completed {
                completed_at,
                result,
            } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'completed', completed_at = $2, result = $3
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .bind(completed_at)
                .bind(result)
                .execute(&self.pool)
                .await?
            }
            JobTransition::Rescheduled {
                error,
                scheduled_at,
            } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'pending', error = $2, scheduled_at = $3
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .bind(error)
                .bind(scheduled_at)
                .execute(&self.pool)
                .await?
            }
            JobTransition::Failed { error } => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'failed', error = $2
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .bind(error)
                .execute(&self.pool)
                .await?
            }
            JobTransition::Cancelled => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'cancelled'
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .execute(&self.pool)
                .await?
            }
            JobTransition::Reset => {
                sqlx::query(
                    r#"
                    UPDATE jobs
                    SET status = 'pending', attempts = 0, error = NULL, scheduled_at = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(id.into_inner())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(JobError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> JobResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE status IN ('completed', 'failed', 'cancelled')
              AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_by_status(&self, tenant_id: TenantId) -> JobResult<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM jobs
            WHERE tenant_id = $1
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(tenant_id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| {
                let status: JobStatus = status
                    .parse()
                    .map_err(|e: String| JobError::Store(format!("invalid row: {e}")))?;
                Ok(StatusCount {
                    status,
                    count: count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn count_by_type(&self, tenant_id: TenantId) -> JobResult<Vec<TypeCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT "type", COUNT(*)
            FROM jobs
            WHERE tenant_id = $1
            GROUP BY "type"
            ORDER BY "type"
            "#,
        )
        .bind(tenant_id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(job_type, count)| TypeCount {
                job_type,
                count: count.max(0) as u64,
            })
            .collect())
    }

    async fn recent_failures(
        &self,
        tenant_id: TenantId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> JobResult<Vec<JobRecord>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM jobs
            WHERE tenant_id = $1 AND status = 'failed' AND created_at >= $2
            ORDER BY created_at DESC
            LIMIT $3
            "#
        ))
        .bind(tenant_id.into_inner())
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }
}
