//! Shared helpers for tests: logging initialization and driver shorthands.

use crate::driver::Driver;
use crate::{Cx, Try};
use std::future::Future;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Runs a root strand on a deterministic (virtual-time) driver.
pub fn run<T, F, Fut>(f: F) -> Try<T>
where
    F: FnOnce(Cx) -> Fut,
    Fut: Future<Output = Try<T>>,
{
    init_test_logging();
    Driver::deterministic().block_on(f)
}

/// Runs a root strand on a deterministic driver and unwraps the outcome.
pub fn run_ok<T, F, Fut>(f: F) -> T
where
    T: std::fmt::Debug,
    F: FnOnce(Cx) -> Fut,
    Fut: Future<Output = Try<T>>,
{
    run(f).expect("root strand failed")
}
