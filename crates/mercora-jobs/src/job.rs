//! Job records, status machine, and creation parameters.

use chrono::{DateTime, Utc};
use mercora_core::{JobId, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Default maximum attempts for a new job.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Job status enumeration.
///
/// Transitions are owned by the dispatcher (`Pending → Running →
/// {Completed | Pending | Failed}`) and by explicit admin actions
/// (`Pending → Cancelled`, `Failed → Pending`). Everything else is
/// rejected by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for dispatch (possibly not yet due).
    Pending,
    /// Claimed by a dispatcher and executing.
    Running,
    /// Handler finished successfully. Terminal.
    Completed,
    /// Attempts exhausted or configuration fault. Terminal.
    Failed,
    /// Cancelled before dispatch. Terminal.
    Cancelled,
}

impl JobStatus {
    /// Returns the persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transitions are possible. Manual retry
    /// of `Failed` is the one exception, as an explicit admin action.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A persisted background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier, immutable.
    pub id: JobId,

    /// Isolation boundary; every query is scoped by it.
    pub tenant_id: TenantId,

    /// Type key resolved against the handler registry at dispatch time.
    #[serde(rename = "type")]
    pub job_type: String,

    /// Opaque structured blob passed verbatim to the handler.
    pub payload: Value,

    /// Current lifecycle status.
    pub status: JobStatus,

    /// Higher is dispatched first.
    pub priority: i32,

    /// Incremented each time the job is claimed.
    pub attempts: u32,

    /// Fixed at creation; `attempts <= max_attempts` holds after every
    /// dispatch tick.
    pub max_attempts: u32,

    /// Last failure message; cleared on manual retry.
    pub error: Option<String>,

    /// Handler return value, set only on `Completed`.
    pub result: Option<Value>,

    /// If present and in the future, the job is not yet due.
    pub scheduled_at: Option<DateTime<Utc>>,

    /// When the job was last claimed.
    pub started_at: Option<DateTime<Utc>>,

    /// When the handler finished successfully.
    pub completed_at: Option<DateTime<Utc>>,

    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Returns true if all attempts have been consumed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Returns true if the job is eligible for dispatch at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending
            && self.scheduled_at.map_or(true, |at| at <= now)
    }
}

/// Parameters for creating a job.
///
/// Builder so call sites only spell out what they deviate from:
///
/// ```rust,ignore
/// let job = NewJob::new("marketplace_sync", serde_json::json!({"shop": 7}))
///     .priority(10)
///     .schedule_at(tonight);
/// service.create_job(&ctx, job).await?;
/// ```
#[derive(Debug, Clone)]
pub struct NewJob {
    pub(crate) job_type: String,
    pub(crate) payload: Value,
    pub(crate) scheduled_at: Option<DateTime<Utc>>,
    pub(crate) priority: i32,
    pub(crate) max_attempts: Option<u32>,
}

impl NewJob {
    /// Creates parameters for a job of the given type.
    #[must_use]
    pub fn new(job_type: impl Into<String>, payload: Value) -> Self {
        Self {
            job_type: job_type.into(),
            payload,
            scheduled_at: None,
            priority: 0,
            max_attempts: None,
        }
    }

    /// Defers the first execution until the given time.
    #[must_use]
    pub fn schedule_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Sets the priority (higher dispatched first).
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Overrides the maximum attempts. Left unset, the attempt budget
    /// comes from [`JobsConfig`](crate::JobsConfig) at creation time
    /// (or [`DEFAULT_MAX_ATTEMPTS`] when no service is involved).
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Materializes the record the store will persist.
    #[must_use]
    pub fn into_record(self, tenant_id: TenantId) -> JobRecord {
        JobRecord {
            id: JobId::new(),
            tenant_id,
            job_type: self.job_type,
            payload: self.payload,
            status: JobStatus::Pending,
            priority: self.priority,
            attempts: 0,
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            error: None,
            result: None,
            scheduled_at: self.scheduled_at,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }
}
