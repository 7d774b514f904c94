//! Execution wrapper: a job's work as a timed, instrumented unit.
//!
//! The wrapper measures wall-clock duration and records it on the job's
//! stats whether the work succeeds or fails. Timeouts and outcome counting
//! are layered on top by the dispatcher.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::job::JobStats;
use crate::core::work::{Work, WorkError};

/// Runs a job's work once, recording elapsed time.
#[derive(Clone)]
pub(crate) struct WorkRunner {
    work: Arc<dyn Work>,
    stats: Arc<JobStats>,
}

impl WorkRunner {
    pub(crate) fn new(work: Arc<dyn Work>, stats: Arc<JobStats>) -> Self {
        Self { work, stats }
    }

    /// Invoke the work and record its wall-clock duration.
    ///
    /// The duration lands on the job's stats regardless of outcome; the
    /// outcome itself is returned to the caller, with elapsed time attached
    /// on success.
    pub(crate) async fn run(&self) -> Result<Duration, WorkError> {
        let started = Instant::now();
        let outcome = self.work.run().await;
        let elapsed = started.elapsed();
        self.stats.record_run_duration(elapsed);
        outcome.map(|()| elapsed)
    }
}
