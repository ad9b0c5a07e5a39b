//! Tracked background tasks that stop during shutdown.
//!
//! Background loops are spawned on a `tokio_util::task::TaskTracker` and
//! watch a `CancellationToken`. [`BackgroundTasks::cleanup_action`] turns the
//! pair into a cleanup action: cancel, close the tracker, wait for every task.
//!
//! ```rust,ignore
//! let tasks = BackgroundTasks::new();
//! tasks.spawn_periodic("heartbeat", Duration::from_secs(5), || async {
//!     tracing::info!("still alive");
//! });
//! builder.register_cleanup(tasks.cleanup_action());
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::cleanup::{CleanupAction, CleanupFn};

/// A set of background tasks sharing one cancellation token.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the tasks should watch.
    pub fn token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Spawn a tracked task. The task is responsible for watching
    /// [`token`](Self::token).
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.task_tracker.spawn(task);
    }

    /// Spawn a task calling `tick` every `period` until cancelled.
    pub fn spawn_periodic<F, Fut>(&self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!(task = name, "Background task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        tick().await;
                    }
                }
            }

            debug!(task = name, "Background task shutting down");
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.task_tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_tracker.is_empty()
    }

    /// Stop every task and wait for it to finish.
    ///
    /// 1. Signals all tasks to stop via the cancellation token
    /// 2. Closes the tracker
    /// 3. Waits for all tasks to complete
    pub async fn shutdown(&self) {
        info!(tasks = self.len(), "Stopping background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Cleanup action running [`shutdown`](Self::shutdown).
    pub fn cleanup_action(&self) -> impl CleanupAction {
        let tasks = self.clone();
        CleanupFn::new("background-tasks", move |_trigger| {
            let tasks = tasks.clone();
            async move {
                tasks.shutdown().await;
                Ok(())
            }
        })
    }
}
