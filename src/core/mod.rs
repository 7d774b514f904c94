//! Core types: job records, run statistics, and the work abstraction.

pub mod job;
pub mod types;
pub mod work;

pub use self::job::{Job, JobStats};
pub use self::types::JobId;
pub use self::work::{work_fn, Work, WorkError};
