//! Error sinks observe failures raised during a shutdown session.
//!
//! Errors from `pre_shutdown`, from every cleanup action and from `finalize`
//! are forwarded to the installed sink as they happen. They originate from
//! concurrent tasks, so delivery order is not defined.
//!
//! # Default behaviour
//!
//! With no sink installed, errors are **dropped**. They are not escalated to
//! a default logger. Install [`LogErrorSink`] to have them logged.

use tracing::error;

/// Receiver of asynchronous shutdown errors.
pub trait ErrorSink: Send + Sync + 'static {
    /// Handle one error. Called zero or more times per session.
    fn on_error(&self, error: anyhow::Error);
}

/// Closure adapter for [`ErrorSink`].
pub struct ErrorFn<F> {
    func: F,
}

impl<F> ErrorFn<F>
where
    F: Fn(anyhow::Error) + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> ErrorSink for ErrorFn<F>
where
    F: Fn(anyhow::Error) + Send + Sync + 'static,
{
    fn on_error(&self, error: anyhow::Error) {
        (self.func)(error)
    }
}

/// Sink that logs every error at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn on_error(&self, err: anyhow::Error) {
        error!(error = format!("{err:#}"), "Shutdown error");
    }
}
