//! Trigger sources detect an external shutdown request.
//!
//! A trigger source is started once by the coordinator. Starting it spawns
//! one listener task (see [`Coordinator::spawn_listener`]) which waits for
//! the source's condition and then calls [`Coordinator::begin_shutdown`]
//! with the source itself. If that call wins the gate, the coordinator runs
//! the source's hooks around the cleanup phase:
//!
//! ```text
//! pre_shutdown() ──► every cleanup action, concurrently ──► barrier ──► finalize()
//! ```
//!
//! Listeners should also watch [`Coordinator::cancellation_token`] and exit
//! without firing once it is cancelled.
//!
//! Built-in variants:
//!
//! - [`SignalTrigger`] - OS termination signals; `finalize` exits the process
//! - [`ManualTrigger`] - fired programmatically; `finalize` returns

use std::sync::Arc;

use async_trait::async_trait;

use crate::coordinator::Coordinator;

pub mod manual;
pub mod signal;

pub use manual::ManualTrigger;
pub use signal::{Signal, SignalTrigger};

/// A pluggable detector of shutdown requests.
#[async_trait]
pub trait TriggerSource: Send + Sync + 'static {
    /// Human-readable name, passed to every cleanup action.
    fn name(&self) -> &str;

    /// Begin listening.
    ///
    /// Must not block: spawn the listener through
    /// [`Coordinator::spawn_listener`] and return. An error here aborts
    /// [`CoordinatorBuilder::start`](crate::CoordinatorBuilder::start).
    fn start(self: Arc<Self>, coordinator: Coordinator) -> anyhow::Result<()>;

    /// Hook run before any cleanup action. Errors go to the error sink.
    async fn pre_shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Hook run after every cleanup action returned. Errors go to the error
    /// sink.
    async fn finalize(&self) -> anyhow::Result<()>;
}
