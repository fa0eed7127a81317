//! Process-wide tracing setup shared by the binaries.

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, DEFAULT_FILTER, LOG_FORMAT_ENV};

/// Install the global subscriber using `RUST_LOG` and `STOCKLEDGER_LOG_FORMAT`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
