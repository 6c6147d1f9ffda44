#![forbid(unsafe_code)]

//! Log subscriber bootstrap.
//!
//! The filter is read from `YRF_LOG` using `tracing-subscriber`'s
//! `EnvFilter` syntax (for example `YRF_LOG=yrf_runtime=debug`). Without it
//! only warnings are shown.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "YRF_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install a formatted subscriber as the global default.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .try_init()
        .is_ok()
}

/// Like [`init`], but writes through the test harness's captured output.
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}
