//! In-process recurring-job scheduler.
//!
//! Callers register periodic jobs with a run interval and an expected
//! single-run duration; a background dispatcher invokes each job at its
//! due time, runs it on a bounded worker pool under a timeout, and tracks
//! success/failure counts. Execution is at-least-once with drift tolerance:
//! due times advance from dispatch time, never from completion time.

pub mod core;
pub(crate) mod execution;
pub mod scheduler;

pub use crate::core::job::JobStats;
pub use crate::core::types::JobId;
pub use crate::core::work::{work_fn, Work, WorkError};
pub use crate::scheduler::{Scheduler, SchedulerError};
