use std::time::Duration;

use thiserror::Error;

/// Errors raised by the coordinator itself.
///
/// Failures produced by application code (a cleanup action, a trigger's
/// `pre_shutdown` or `finalize`) are not wrapped in this type: they travel to
/// the error sink as the original [`anyhow::Error`]. The variants below are
/// the coordinator's own failures.
///
/// # Start Errors
///
/// - `TriggerStart` - a trigger source could not begin listening; returned
///   synchronously from [`CoordinatorBuilder::start`](crate::CoordinatorBuilder::start)
/// - `NoRuntime` - `start` was called outside a Tokio runtime
///
/// # Sequence Errors
///
/// These are reported to the error sink and never abort the sequence:
///
/// - `CleanupPanicked` - a cleanup task panicked instead of returning
/// - `HookPanicked` - a trigger's `pre_shutdown` or `finalize` panicked
/// - `CleanupTimeout` - the optional cleanup deadline expired
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Trigger source '{trigger}' failed to start: {source}")]
    TriggerStart {
        trigger: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Coordinator must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("Cleanup action '{label}' panicked")]
    CleanupPanicked { label: String },

    #[error("Trigger source '{trigger}' panicked in {phase}")]
    HookPanicked {
        trigger: String,
        phase: &'static str,
    },

    #[error("Cleanup actions did not finish within {timeout:?} ({pending} still running)")]
    CleanupTimeout { timeout: Duration, pending: usize },

    #[error("Unsupported signal on this platform: {0}")]
    UnsupportedSignal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

/// Convenience type alias for Results with CoordinatorError.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
