//! Cleanup actions run during a shutdown session.
//!
//! A cleanup action is a single teardown operation: closing a connection
//! pool, flushing a buffer, stopping a background worker. Every registered
//! action is invoked exactly once per session, concurrently with all the
//! others and in no particular order. An action must therefore not depend on
//! the side effects of another.
//!
//! Most callers never implement [`CleanupAction`] by hand and use one of the
//! closure adapters instead:
//!
//! ```rust,ignore
//! use shutdown_coordinator::cleanup::{CleanupFn, teardown};
//!
//! // Receives the name of the trigger that fired
//! builder.register_cleanup(CleanupFn::new("audit", |trigger| async move {
//!     tracing::info!(%trigger, "writing audit record");
//!     Ok(())
//! }));
//!
//! // Zero-argument teardown, trigger name discarded
//! let pool = pool.clone();
//! builder.register_cleanup(teardown("database", move || {
//!     let pool = pool.clone();
//!     async move {
//!         pool.close().await;
//!         Ok(())
//!     }
//! }));
//! ```

use std::future::Future;

use async_trait::async_trait;

/// A teardown operation invoked once when a shutdown session runs.
#[async_trait]
pub trait CleanupAction: Send + Sync + 'static {
    /// Label used in logs and error reports. Carries no ordering meaning.
    fn label(&self) -> &str {
        "cleanup"
    }

    /// Run the teardown.
    ///
    /// `trigger` is the name of the trigger source that started the session.
    async fn on_shutdown(&self, trigger: &str) -> anyhow::Result<()>;
}

/// Labelled closure adapter for [`CleanupAction`].
///
/// The closure receives the firing trigger's name by value so the returned
/// future can own it.
pub struct CleanupFn<F> {
    label: String,
    func: F,
}

impl<F, Fut> CleanupFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Wrap `func` as a cleanup action named `label`.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> CleanupAction for CleanupFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn label(&self) -> &str {
        &self.label
    }

    async fn on_shutdown(&self, trigger: &str) -> anyhow::Result<()> {
        (self.func)(trigger.to_string()).await
    }
}

/// Adapt a zero-argument teardown into a cleanup action.
///
/// The firing trigger's name is discarded.
pub fn teardown<G, Fut>(
    label: impl Into<String>,
    func: G,
) -> CleanupFn<impl Fn(String) -> Fut + Send + Sync + 'static>
where
    G: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    CleanupFn::new(label, move |_trigger: String| func())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cleanup_fn_receives_trigger_name() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let action = CleanupFn::new("recorder", move |trigger| {
            let seen = seen_clone.clone();
            async move {
                *seen.lock().unwrap() = Some(trigger);
                Ok(())
            }
        });

        action.on_shutdown("os-signal").await.unwrap();

        assert_eq!(action.label(), "recorder");
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("os-signal")
        );
    }

    #[tokio::test]
    async fn test_cleanup_fn_propagates_error() {
        let action = CleanupFn::new("failing", |_| async { Err(anyhow::anyhow!("disk full")) });

        let err = action.on_shutdown("manual").await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[tokio::test]
    async fn test_teardown_ignores_trigger() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let action = teardown("database", move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        action.on_shutdown("anything").await.unwrap();

        assert_eq!(action.label(), "database");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct Unlabelled;

    #[async_trait]
    impl CleanupAction for Unlabelled {
        async fn on_shutdown(&self, _trigger: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_label() {
        assert_eq!(Unlabelled.label(), "cleanup");
    }
}
