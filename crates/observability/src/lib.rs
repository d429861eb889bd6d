//! Structured logging setup shared by binaries and tests.

pub mod logging;

pub use logging::{LogFormat, init_with};

/// Initialize process-wide logging from the environment.
///
/// `RUST_LOG` sets the filter (default `info`); `LOG_FORMAT=pretty` switches
/// from JSON to human-readable output. Safe to call multiple times; later
/// calls are no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    init_with(format);
}
