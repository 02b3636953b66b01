//! Tracing/logging setup and audit-log helpers (shared by the API and workers).

/// Tracing configuration (filters, output format).
pub mod tracing;

/// Internal audit trail for access decisions.
pub mod audit;

pub use self::tracing::LogFormat;

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}
