//! Dispatcher loop: waits on the queue head and hands due jobs to the
//! worker pool.
//!
//! A single perpetual task alternates between two states: waiting for the
//! earliest-due job to become due, and dispatching it. The timed wait races
//! against a preempt signal so that a newly registered job that becomes the
//! new head cancels a stale sleep instead of waiting it out.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

use crate::core::job::{Job, JobStats};
use crate::core::types::JobId;
use crate::core::work::WorkError;
use crate::execution::WorkRunner;

use super::queue::DueQueue;

pub(crate) struct Dispatcher {
    queue: Arc<DueQueue>,
    preempt: Arc<Notify>,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    pub(crate) fn new(queue: Arc<DueQueue>, preempt: Arc<Notify>, worker_count: usize) -> Self {
        Self {
            queue,
            preempt,
            workers: Arc::new(Semaphore::new(worker_count)),
        }
    }

    /// Run the dispatch loop for the lifetime of the scheduler.
    pub(crate) async fn run(self) {
        loop {
            let mut job = self.queue.take_earliest().await;
            let now = Utc::now();

            if job.next_due_at() > now {
                let wait = (job.next_due_at() - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                self.queue.insert(job).await;

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = self.preempt.notified() => {
                        tracing::debug!("woken before head was due, re-evaluating queue");
                    }
                }
            } else {
                tracing::info!(job_id = %job.id(), due_at = %job.next_due_at(), "dispatching job");
                self.spawn_execution(&job);
                job.reschedule(now);
                self.queue.insert(job).await;
            }
        }
    }

    /// Submit one execution of the job to the worker pool.
    ///
    /// Non-blocking from the loop's perspective. A supervising task enforces
    /// the job's `expected_run` timeout, measured from submission, and
    /// resolves the outcome into exactly one counter increment. A run that
    /// times out is abandoned, not aborted: it keeps its pool permit until
    /// the work actually returns.
    fn spawn_execution(&self, job: &Job) {
        let id = job.id();
        let stats = job.stats();
        let budget = job.expected_run();
        let runner = WorkRunner::new(job.work(), job.stats());
        let workers = Arc::clone(&self.workers);

        tokio::spawn(async move {
            let execution = tokio::spawn(async move {
                let _permit = match workers.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(WorkError::Failed("worker pool closed".to_string())),
                };
                runner.run().await
            });

            match tokio::time::timeout(budget, execution).await {
                Ok(Ok(outcome)) => resolve(id, &stats, outcome),
                Ok(Err(join_error)) => {
                    let run = stats.record_failure();
                    tracing::error!(job_id = %id, run, error = %join_error, "job run panicked");
                }
                Err(_) => {
                    let run = stats.record_failure();
                    tracing::warn!(
                        job_id = %id,
                        run,
                        timeout_ms = budget.as_millis() as u64,
                        "job run exceeded its expected duration, counting as failed"
                    );
                }
            }
        });
    }
}

fn resolve(id: JobId, stats: &JobStats, outcome: Result<Duration, WorkError>) {
    match outcome {
        Ok(elapsed) => {
            let run = stats.record_success();
            tracing::info!(
                job_id = %id,
                run,
                duration_ms = elapsed.as_millis() as u64,
                "job run succeeded"
            );
        }
        Err(error) => {
            let run = stats.record_failure();
            tracing::error!(job_id = %id, run, error = %error, "job run failed");
        }
    }
}
