//! Common test utilities shared across integration tests.

use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait for a condition to become true, polling every 10ms.
///
/// This is more reliable than fixed sleeps since execution time can vary.
///
/// # Panics
///
/// Panics if the timeout is reached before the condition holds.
pub async fn wait_until<F>(condition: F, timeout: Duration, what: &str)
where
    F: Fn() -> bool,
{
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout after {:?} waiting for: {}", timeout, what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
