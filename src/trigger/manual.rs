//! Programmatic trigger.
//!
//! Fires when [`ManualTrigger::fire`] is called, e.g. from an admin endpoint
//! or a test. Both hooks are no-ops, so the coordinator ends up
//! [`Terminated`](crate::CoordinatorState::Terminated) with the process still
//! running.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::trigger::TriggerSource;

/// Trigger source fired from code. Clones share the same trigger.
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    name: String,
    notify: Arc<Notify>,
}

impl ManualTrigger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request shutdown.
    ///
    /// Firing before the coordinator is started is remembered and takes
    /// effect once the listener runs.
    pub fn fire(&self) {
        info!(trigger = %self.name, "Manual shutdown requested");
        self.notify.notify_one();
    }
}

#[async_trait]
impl TriggerSource for ManualTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> anyhow::Result<()> {
        let token = coordinator.cancellation_token();
        let handle = coordinator.clone();
        let notify = self.notify.clone();
        let trigger: Arc<dyn TriggerSource> = self;

        coordinator.spawn_listener(async move {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    debug!(trigger = trigger.name(), "Manual trigger listener received cancellation");
                }
                _ = notify.notified() => {
                    handle.begin_shutdown(trigger).await;
                }
            }
        });

        Ok(())
    }

    async fn finalize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
