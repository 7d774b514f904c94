//! Job record: scheduling parameters plus run-time state.
//!
//! A `Job` pairs the caller-supplied work with its cadence (interval and
//! per-run timeout budget) and the mutable state the scheduler maintains:
//! the next due time and the shared run counters.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use super::types::JobId;
use super::work::Work;

/// Sentinel for "no completed run yet" in [`JobStats`].
const NEVER_RAN: u64 = u64::MAX;

/// Run statistics shared between the scheduler and its callers.
///
/// Counters are monotone and incremented exactly once per resolved
/// execution; a run still in flight is not yet counted. All fields are
/// atomics so the dispatcher, worker tasks, and introspecting callers
/// never contend on a lock.
#[derive(Debug, Default)]
pub struct JobStats {
    successes: AtomicU64,
    failures: AtomicU64,
    last_run_nanos: AtomicU64,
}

impl JobStats {
    pub(crate) fn new() -> Self {
        Self {
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_run_nanos: AtomicU64::new(NEVER_RAN),
        }
    }

    /// Number of runs that completed successfully.
    pub fn successes(&self) -> u64 {
        self.successes.load(AtomicOrdering::SeqCst)
    }

    /// Number of runs that failed, timed out, or panicked.
    pub fn failures(&self) -> u64 {
        self.failures.load(AtomicOrdering::SeqCst)
    }

    /// Wall-clock duration of the most recent completed run, if any.
    pub fn last_execution_duration(&self) -> Option<Duration> {
        match self.last_run_nanos.load(AtomicOrdering::SeqCst) {
            NEVER_RAN => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }

    /// Record a successful run; returns the new success count.
    pub(crate) fn record_success(&self) -> u64 {
        self.successes.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    /// Record a failed run; returns the new failure count.
    pub(crate) fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    /// Record the wall-clock duration of a run, success or failure.
    ///
    /// Stored at nanosecond precision so the value reads back exactly as
    /// measured.
    pub(crate) fn record_run_duration(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(NEVER_RAN - 1);
        self.last_run_nanos.store(nanos, AtomicOrdering::SeqCst);
    }
}

/// A registered recurring job.
///
/// Owned by the queue between dispatches and by the dispatcher while a
/// scheduling decision is made; `next_due_at` is only ever mutated through
/// that single-owner hand-off, so it needs no synchronization.
pub struct Job {
    id: JobId,
    expected_run: Duration,
    interval: chrono::Duration,
    work: Arc<dyn Work>,
    stats: Arc<JobStats>,
    arrival: u64,
    next_due_at: DateTime<Utc>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("expected_run", &self.expected_run)
            .field("interval", &self.interval)
            .field("arrival", &self.arrival)
            .field("next_due_at", &self.next_due_at)
            .finish()
    }
}

impl Job {
    /// Create a job due `interval` past `now`.
    ///
    /// `arrival` is the registration sequence number; it breaks due-time
    /// ties so that equal due times dispatch in registration order.
    pub(crate) fn new(
        id: JobId,
        expected_run: Duration,
        interval: chrono::Duration,
        work: Arc<dyn Work>,
        arrival: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            expected_run,
            interval,
            work,
            stats: Arc::new(JobStats::new()),
            arrival,
            next_due_at: now + interval,
        }
    }

    /// Get the job ID.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Get the per-run timeout budget.
    pub fn expected_run(&self) -> Duration {
        self.expected_run
    }

    /// Get the scheduling interval.
    pub fn interval(&self) -> chrono::Duration {
        self.interval
    }

    /// Get the absolute time at which this job next becomes due.
    pub fn next_due_at(&self) -> DateTime<Utc> {
        self.next_due_at
    }

    /// Get the registration sequence number.
    pub fn arrival(&self) -> u64 {
        self.arrival
    }

    /// Get a handle to the job's run statistics.
    pub fn stats(&self) -> Arc<JobStats> {
        Arc::clone(&self.stats)
    }

    pub(crate) fn work(&self) -> Arc<dyn Work> {
        Arc::clone(&self.work)
    }

    /// Advance the due time to `interval` past the given timestamp.
    ///
    /// Called at dispatch time, not completion time, so execution duration
    /// never accumulates into the cadence.
    pub(crate) fn reschedule(&mut self, now: DateTime<Utc>) {
        self.next_due_at = now + self.interval;
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    /// Order by due time, earliest first; ties by registration order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_due_at
            .cmp(&other.next_due_at)
            .then(self.arrival.cmp(&other.arrival))
    }
}
