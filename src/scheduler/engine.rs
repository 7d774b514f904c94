//! Scheduler facade.
//!
//! Owns the due-time queue, the worker-pool semaphore, and the dispatcher
//! task; exposes job registration with duplicate-ID rejection and read-only
//! introspection of the registered set and queue.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::core::job::{Job, JobStats};
use crate::core::types::JobId;
use crate::core::work::Work;

use super::dispatcher::Dispatcher;
use super::queue::DueQueue;

/// Errors surfaced synchronously to registration callers.
///
/// Execution-time failures are never propagated here; they are contained at
/// the dispatch boundary and recorded on the job's counters.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job with this ID is already registered.
    #[error("job {0} is already registered")]
    DuplicateJob(JobId),

    /// The interval or expected run duration cannot be scheduled.
    #[error("invalid schedule for job {0}: {1}")]
    InvalidSchedule(JobId, String),
}

/// In-process recurring-job scheduler.
///
/// One dedicated dispatcher task plus a worker pool of `worker_count` slots
/// shared across all jobs. A slow or hung job holds a slot until its work
/// returns, which can exhaust the pool under load; jobs are not isolated
/// from each other.
///
/// # Example
///
/// ```ignore
/// use metronome::{work_fn, JobId, Scheduler};
/// use std::time::Duration;
///
/// let scheduler = Scheduler::new(10);
/// scheduler
///     .register_job(
///         Duration::from_secs(30),
///         Duration::from_secs(60),
///         work_fn(|| async { Ok(()) }),
///         JobId::new(),
///     )
///     .await?;
/// ```
pub struct Scheduler {
    queue: Arc<DueQueue>,
    preempt: Arc<Notify>,
    jobs: Mutex<HashMap<JobId, Arc<JobStats>>>,
    arrivals: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl Scheduler {
    /// Create a scheduler and start its dispatcher on the ambient runtime.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be positive");

        let queue = Arc::new(DueQueue::new());
        let preempt = Arc::new(Notify::new());
        let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::clone(&preempt), worker_count);
        let handle = tokio::spawn(dispatcher.run());

        tracing::info!(workers = worker_count, "scheduler started");

        Self {
            queue,
            preempt,
            jobs: Mutex::new(HashMap::new()),
            arrivals: AtomicU64::new(0),
            dispatcher: handle,
        }
    }

    /// Register a recurring job.
    ///
    /// The job first becomes due `interval` from now, then every `interval`
    /// after each dispatch. Each run is given `expected_run` to complete
    /// before it is counted as failed by timeout.
    ///
    /// Fails with [`SchedulerError::DuplicateJob`] if `id` is already
    /// registered; no state is mutated on failure. If the new job becomes
    /// the earliest-due entry, the dispatcher is woken to re-evaluate an
    /// in-progress wait. Registration never waits on job execution.
    pub async fn register_job(
        &self,
        expected_run: Duration,
        interval: Duration,
        work: Arc<dyn Work>,
        id: JobId,
    ) -> Result<(), SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidSchedule(
                id,
                "interval must be positive".to_string(),
            ));
        }
        if expected_run.is_zero() {
            return Err(SchedulerError::InvalidSchedule(
                id,
                "expected run duration must be positive".to_string(),
            ));
        }
        let interval = chrono::Duration::from_std(interval)
            .map_err(|e| SchedulerError::InvalidSchedule(id, e.to_string()))?;

        // Registered set and queue are updated under this one lock, so a
        // concurrent duplicate attempt can never observe a half-registered
        // job.
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&id) {
            return Err(SchedulerError::DuplicateJob(id));
        }

        let arrival = self.arrivals.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, expected_run, interval, work, arrival, Utc::now());
        jobs.insert(id, job.stats());

        let interval_ms = interval.num_milliseconds();
        let is_head = self.queue.insert(job).await;
        drop(jobs);

        tracing::info!(job_id = %id, interval_ms, "job registered");
        if is_head {
            tracing::debug!(job_id = %id, "new job is earliest due, waking dispatcher");
            self.preempt.notify_one();
        }

        Ok(())
    }

    /// IDs of all registered jobs.
    pub async fn registered_job_ids(&self) -> HashSet<JobId> {
        self.jobs.lock().await.keys().copied().collect()
    }

    /// Number of jobs currently in the queue.
    pub async fn queue_size(&self) -> usize {
        self.queue.len().await
    }

    /// Run statistics for a registered job, if it exists.
    pub async fn job_stats(&self, id: &JobId) -> Option<Arc<JobStats>> {
        self.jobs.lock().await.get(id).cloned()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // The dispatcher has no terminal state of its own; it lives exactly
        // as long as the scheduler.
        self.dispatcher.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::work::{work_fn, WorkError};
    use std::sync::atomic::AtomicU32;

    fn counting_work(count: &Arc<AtomicU32>) -> Arc<dyn Work> {
        let counter = Arc::clone(count);
        work_fn(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_register_job_enqueues_with_due_time() {
        let scheduler = Scheduler::new(1);
        let id = JobId::new();

        let before = Utc::now();
        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_secs(60),
                work_fn(|| async { Ok(()) }),
                id,
            )
            .await
            .unwrap();
        let after = Utc::now();

        assert_eq!(scheduler.queue_size().await, 1);
        assert!(scheduler.registered_job_ids().await.contains(&id));

        let (head, due_at) = scheduler.queue.peek().await.unwrap();
        assert_eq!(head, id);
        assert!(due_at >= before + chrono::Duration::seconds(60));
        assert!(due_at <= after + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected_without_mutation() {
        let scheduler = Scheduler::new(1);
        let id = JobId::new();

        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_secs(60),
                work_fn(|| async { Ok(()) }),
                id,
            )
            .await
            .unwrap();

        let result = scheduler
            .register_job(
                Duration::from_secs(2),
                Duration::from_secs(30),
                work_fn(|| async { Ok(()) }),
                id,
            )
            .await;

        assert!(matches!(result, Err(SchedulerError::DuplicateJob(dup)) if dup == id));
        assert_eq!(scheduler.registered_job_ids().await.len(), 1);
        assert_eq!(scheduler.queue_size().await, 1);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let scheduler = Scheduler::new(1);

        let result = scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::ZERO,
                work_fn(|| async { Ok(()) }),
                JobId::new(),
            )
            .await;

        assert!(matches!(result, Err(SchedulerError::InvalidSchedule(..))));
        assert!(scheduler.registered_job_ids().await.is_empty());
        assert_eq!(scheduler.queue_size().await, 0);
    }

    #[tokio::test]
    async fn test_registered_job_runs_on_its_interval() {
        let scheduler = Scheduler::new(4);
        let count = Arc::new(AtomicU32::new(0));
        let id = JobId::new();

        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_millis(100),
                counting_work(&count),
                id,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;

        let runs = count.load(Ordering::SeqCst);
        assert!((3..=7).contains(&runs), "expected 3..=7 runs, got {runs}");

        let stats = scheduler.job_stats(&id).await.unwrap();
        assert_eq!(stats.successes() as u32, runs);
        assert_eq!(stats.failures(), 0);
        assert!(stats.last_execution_duration().is_some());
    }

    #[tokio::test]
    async fn test_new_earliest_job_preempts_long_wait() {
        let scheduler = Scheduler::new(2);

        // First registration leaves the dispatcher sleeping toward a due
        // time an hour out.
        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_secs(3_600),
                work_fn(|| async { Ok(()) }),
                JobId::new(),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let count = Arc::new(AtomicU32::new(0));
        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_millis(100),
                counting_work(&count),
                JobId::new(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(
            count.load(Ordering::SeqCst) >= 1,
            "short-interval job should preempt the hour-long wait"
        );
    }

    #[tokio::test]
    async fn test_failing_job_errors_stay_contained() {
        let scheduler = Scheduler::new(2);
        let id = JobId::new();

        scheduler
            .register_job(
                Duration::from_secs(1),
                Duration::from_millis(100),
                work_fn(|| async { Err(WorkError::Failed("always".to_string())) }),
                id,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(450)).await;

        let stats = scheduler.job_stats(&id).await.unwrap();
        assert!(stats.failures() >= 2);
        assert_eq!(stats.successes(), 0);
        // The job is still being rescheduled.
        assert_eq!(scheduler.queue_size().await, 1);
    }

    #[tokio::test]
    async fn test_stats_for_unknown_job_is_none() {
        let scheduler = Scheduler::new(1);
        assert!(scheduler.job_stats(&JobId::new()).await.is_none());
    }
}
