//! # Shutdown Coordinator
//!
//! Graceful shutdown for long-running services. Independent trigger sources
//! and independent cleanup actions are registered once at startup; when any
//! trigger fires, exactly one shutdown sequence runs every cleanup action and
//! then finalizes the process.
//!
//! - **Exactly once**: concurrent or repeated triggers run a single sequence
//! - **Concurrent cleanup**: every action runs in its own task, then a barrier
//! - **Best effort**: failures go to an optional error sink and never stop the
//!   sequence
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Trigger Sources (SignalTrigger, ManualTrigger, custom)          │
//! │          │ first to fire wins                                    │
//! │          ▼                                                       │
//! │  Coordinator::begin_shutdown ── gate (AtomicBool) ── losers: no-op │
//! │          │                                                       │
//! │          ├─► trigger.pre_shutdown()                              │
//! │          ├─► cleanup A ┐                                         │
//! │          ├─► cleanup B ├─ concurrent tasks ─► barrier            │
//! │          ├─► cleanup C ┘                                         │
//! │          └─► trigger.finalize()   (SignalTrigger: exit(0))       │
//! │                                                                  │
//! │  errors from every step ─────────► ErrorSink (optional)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shutdown_coordinator::{CoordinatorBuilder, ErrorFn, SignalTrigger};
//! use shutdown_coordinator::cleanup::teardown;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut builder = CoordinatorBuilder::new();
//!     builder
//!         .register_trigger(SignalTrigger::default())
//!         .register_cleanup(teardown("database", || async {
//!             // close the pool here
//!             Ok(())
//!         }))
//!         .set_error_sink(ErrorFn::new(|err| eprintln!("shutdown error: {err:#}")));
//!
//!     let coordinator = builder.start()?;
//!
//!     // Serve requests...
//!     coordinator.terminated().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Caveat
//!
//! Without an error sink, failures during shutdown are silently dropped.

pub mod cleanup;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod sink;
pub mod tasks;
pub mod trigger;

// Re-exports for convenience
pub use cleanup::{CleanupAction, CleanupFn};
pub use config::ShutdownConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorState};
pub use error::{CoordinatorError, CoordinatorResult};
pub use sink::{ErrorFn, ErrorSink, LogErrorSink};
pub use tasks::BackgroundTasks;
pub use trigger::{ManualTrigger, Signal, SignalTrigger, TriggerSource};
