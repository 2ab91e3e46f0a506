//! Tracing/logging setup shared by every labtrack entry point.

use labtrack_core::LogFormat;

/// Initialize process-wide tracing with an explicit output format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init_with_format(format: LogFormat) {
    tracing::init(format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
