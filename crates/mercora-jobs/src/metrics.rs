//! Prometheus metrics for the job engine.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the job engine.
pub mod names {
    /// Total jobs created.
    pub const JOBS_CREATED_TOTAL: &str = "mercora_jobs_created_total";
    /// Total jobs claimed for processing.
    pub const JOBS_CLAIMED_TOTAL: &str = "mercora_jobs_claimed_total";
    /// Total jobs completed successfully.
    pub const JOBS_COMPLETED_TOTAL: &str = "mercora_jobs_completed_total";
    /// Total jobs failed permanently.
    pub const JOBS_FAILED_TOTAL: &str = "mercora_jobs_failed_total";
    /// Total jobs rescheduled for retry.
    pub const JOBS_RETRIED_TOTAL: &str = "mercora_jobs_retried_total";
    /// Total jobs cancelled.
    pub const JOBS_CANCELLED_TOTAL: &str = "mercora_jobs_cancelled_total";
    /// Total terminal jobs removed by cleanup.
    pub const JOBS_CLEANED_TOTAL: &str = "mercora_jobs_cleaned_total";

    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "mercora_job_duration_seconds";
    /// Dispatcher tick duration in seconds.
    pub const DISPATCH_TICK_SECONDS: &str = "mercora_dispatch_tick_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::JOBS_CREATED_TOTAL, "Total number of jobs created");
    describe_counter!(
        names::JOBS_CLAIMED_TOTAL,
        "Total number of jobs claimed for processing"
    );
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of jobs that failed permanently"
    );
    describe_counter!(
        names::JOBS_RETRIED_TOTAL,
        "Total number of jobs rescheduled for retry"
    );
    describe_counter!(
        names::JOBS_CANCELLED_TOTAL,
        "Total number of jobs cancelled"
    );
    describe_counter!(
        names::JOBS_CLEANED_TOTAL,
        "Total number of terminal jobs removed by cleanup"
    );

    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job execution duration in seconds"
    );
    describe_histogram!(
        names::DISPATCH_TICK_SECONDS,
        "Dispatcher tick duration in seconds"
    );
}

/// Job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job created.
    pub fn job_created(job_type: &str) {
        counter!(
            names::JOBS_CREATED_TOTAL,
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    /// Record a job claimed.
    pub fn job_claimed(job_type: &str) {
        counter!(
            names::JOBS_CLAIMED_TOTAL,
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    /// Record a job completed.
    pub fn job_completed(job_type: &str, duration: Duration) {
        counter!(
            names::JOBS_COMPLETED_TOTAL,
            "job_type" => job_type.to_string()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_type" => job_type.to_string(),
            "status" => "completed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a permanent job failure.
    pub fn job_failed(job_type: &str, reason: &str, duration: Duration) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "job_type" => job_type.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "job_type" => job_type.to_string(),
            "status" => "failed"
        )
        .record(duration.as_secs_f64());
    }

    /// Record a job rescheduled for retry.
    pub fn job_retried(job_type: &str, attempt: u32) {
        counter!(
            names::JOBS_RETRIED_TOTAL,
            "job_type" => job_type.to_string(),
            "attempt" => attempt.to_string()
        )
        .increment(1);
    }

    /// Record a job cancelled.
    pub fn job_cancelled(job_type: &str) {
        counter!(
            names::JOBS_CANCELLED_TOTAL,
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    /// Record terminal jobs removed by cleanup.
    pub fn jobs_cleaned(count: u64) {
        counter!(names::JOBS_CLEANED_TOTAL).increment(count);
    }
}

/// Dispatcher metrics recorder.
#[derive(Clone)]
pub struct DispatcherMetrics;

impl DispatcherMetrics {
    /// Record a dispatch tick.
    pub fn tick_duration(duration: Duration) {
        histogram!(names::DISPATCH_TICK_SECONDS).record(duration.as_secs_f64());
    }
}
