//! Scheduling engine: due-time queue, dispatcher loop, and the scheduler
//! facade.

mod dispatcher;
mod engine;
mod queue;

pub use self::engine::{Scheduler, SchedulerError};
