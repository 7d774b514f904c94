//! Work trait and error types.
//!
//! `Work` is the caller-supplied body of a recurring job: invoked with no
//! arguments, returning success or an error. Implement the trait directly,
//! or wrap an async closure with [`work_fn`].

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a job's work callable.
///
/// These are never surfaced to the registration caller; the dispatcher
/// records them against the job's failure counter and logs them.
#[derive(Debug, Error)]
pub enum WorkError {
    /// Work failed with a message.
    #[error("work failed: {0}")]
    Failed(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The body of a recurring job.
///
/// # Example
///
/// ```ignore
/// use metronome::{Work, WorkError};
/// use async_trait::async_trait;
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Work for Heartbeat {
///     async fn run(&self) -> Result<(), WorkError> {
///         // ping something
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync {
    /// Execute one run of the job.
    async fn run(&self) -> Result<(), WorkError>;
}

struct FnWork<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Work for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    async fn run(&self) -> Result<(), WorkError> {
        (self.f)().await
    }
}

/// Wrap an async closure as a [`Work`] trait object.
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn Work>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    Arc::new(FnWork { f })
}
