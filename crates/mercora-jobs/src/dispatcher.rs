//! Pending-job dispatcher.
//!
//! A dispatch tick lists due pending jobs, claims each one atomically,
//! runs the registered handler and writes the outcome back. Handler
//! errors reschedule the job with exponential backoff until its
//! attempt budget is spent, then fail it permanently.

use crate::error::{JobError, JobResult};
use crate::job::JobRecord;
use crate::metrics::{DispatcherMetrics, JobMetrics};
use crate::registry::HandlerRegistry;
use crate::retry::RetryPolicy;
use crate::store::{JobStore, JobTransition};
use chrono::Utc;
use mercora_core::JobId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives pending jobs through their handlers.
///
/// Safe to call concurrently from several tasks or processes. Within a
/// process an in-flight set skips jobs another tick is already working
/// on; across processes the store's conditional claim is the gate.
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    retry: RetryPolicy,
    in_flight: Mutex<HashSet<JobId>>,
}

/// Removes the job from the in-flight set when a tick is done with it,
/// including on handler panic unwind.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<JobId>>,
    id: JobId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

impl Dispatcher {
    /// Creates a dispatcher over a store and handler registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<HandlerRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            retry,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs one dispatch tick.
    ///
    /// Lists up to `batch_size` due pending jobs and processes each in
    /// turn, returning how many this tick actually claimed. A failure
    /// in one job never aborts the rest of the batch, and a store
    /// failure never escapes to the caller: schedulers poll this in a
    /// loop, so a transient outage costs one empty tick, not the loop.
    pub async fn process_pending_jobs(&self, batch_size: usize) -> usize {
        let started = Instant::now();
        let due = match self.store.list_due(Utc::now(), batch_size).await {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "Failed to list due jobs, skipping tick");
                DispatcherMetrics::tick_duration(started.elapsed());
                return 0;
            }
        };

        let mut processed = 0;
        for job in due {
            match self.process_one(job).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(err) => {
                    // Store trouble mid-batch. Skip the job and keep
                    // going; the next tick will see it again.
                    error!(error = %err, "Failed to process job, skipping");
                }
            }
        }

        DispatcherMetrics::tick_duration(started.elapsed());
        if processed > 0 {
            debug!(processed, "Dispatch tick finished");
        }
        processed
    }

    /// Claims and runs a single job. Returns `Ok(false)` when the job
    /// was already taken, either by this process or another one.
    async fn process_one(&self, job: JobRecord) -> JobResult<bool> {
        let id = job.id;
        let _guard = {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(id) {
                return Ok(false);
            }
            InFlightGuard {
                set: &self.in_flight,
                id,
            }
        };

        if !self.store.claim(id).await? {
            debug!(job_id = %id, "Job claimed elsewhere");
            return Ok(false);
        }
        JobMetrics::job_claimed(&job.job_type);

        // Attempts were bumped by the claim; keep our copy in step so
        // backoff and exhaustion checks see the stored value.
        let attempts = job.attempts + 1;
        let started = Instant::now();

        let handler = match self.registry.resolve(&job.job_type) {
            Ok(handler) => handler,
            Err(err) => {
                // No handler is a configuration problem, not a
                // transient one. Retrying cannot fix it.
                warn!(job_id = %id, job_type = %job.job_type, "No handler registered");
                self.store
                    .update(
                        id,
                        JobTransition::Failed {
                            error: err.to_string(),
                        },
                    )
                    .await?;
                JobMetrics::job_failed(&job.job_type, "no_handler", started.elapsed());
                return Ok(true);
            }
        };

        match handler(job.tenant_id, job.payload.clone()).await {
            Ok(result) => {
                self.store
                    .update(
                        id,
                        JobTransition::Completed {
                            completed_at: Utc::now(),
                            result: Some(result),
                        },
                    )
                    .await?;
                JobMetrics::job_completed(&job.job_type, started.elapsed());
                info!(job_id = %id, job_type = %job.job_type, attempts, "Job completed");
            }
            Err(err) => {
                self.handle_failure(&job, attempts, &err, started).await?;
            }
        }

        Ok(true)
    }

    /// Writes back a handler failure: reschedule with backoff while
    /// attempts remain, fail permanently once the budget is spent.
    async fn handle_failure(
        &self,
        job: &JobRecord,
        attempts: u32,
        err: &JobError,
        started: Instant,
    ) -> JobResult<()> {
        let message = err.to_string();

        if attempts < job.max_attempts {
            let scheduled_at = self.retry.next_run_at(Utc::now(), attempts);
            self.store
                .update(
                    job.id,
                    JobTransition::Rescheduled {
                        error: message.clone(),
                        scheduled_at,
                    },
                )
                .await?;
            JobMetrics::job_retried(&job.job_type, attempts);
            warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts,
                scheduled_at = %scheduled_at,
                error = %message,
                "Job failed, rescheduled"
            );
        } else {
            self.store
                .update(job.id, JobTransition::Failed { error: message.clone() })
                .await?;
            JobMetrics::job_failed(&job.job_type, "handler_error", started.elapsed());
            error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts,
                error = %message,
                "Job failed permanently"
            );
        }

        Ok(())
    }
}
