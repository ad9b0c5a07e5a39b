//! The shutdown coordinator.
//!
//! Registration happens on a [`CoordinatorBuilder`]. Calling
//! [`start`](CoordinatorBuilder::start) consumes the builder, starts every
//! trigger source and hands back a cloneable [`Coordinator`]. From then on the
//! registries are read-only.
//!
//! # Shutdown Session
//!
//! The first trigger to call [`Coordinator::begin_shutdown`] runs the one and
//! only session for this coordinator:
//!
//! 1. `pre_shutdown()` of the firing trigger
//! 2. every cleanup action, each in its own task, given the trigger's name
//! 3. wait for all of them (no retries, nothing skipped on failure)
//! 4. `finalize()` of the firing trigger
//!
//! Every error along the way goes to the error sink and the sequence keeps
//! going. A panicking hook or action is reported the same way. Any other `begin_shutdown` call, concurrent or later, returns
//! `false` straight away.
//!
//! # Example
//!
//! ```rust,no_run
//! use shutdown_coordinator::{CoordinatorBuilder, LogErrorSink, SignalTrigger};
//! use shutdown_coordinator::cleanup::teardown;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut builder = CoordinatorBuilder::new();
//!     builder
//!         .register_trigger(SignalTrigger::default())
//!         .register_cleanup(teardown("cache", || async { Ok(()) }))
//!         .set_error_sink(LogErrorSink);
//!
//!     let coordinator = builder.start()?;
//!     coordinator.terminated().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cleanup::CleanupAction;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::metrics;
use crate::sink::ErrorSink;
use crate::trigger::TriggerSource;

pub mod state;

pub use state::CoordinatorState;

/// Phase of a shutdown session an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    PreShutdown,
    Cleanup,
    Finalize,
}

impl Phase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Phase::PreShutdown => "pre_shutdown",
            Phase::Cleanup => "cleanup",
            Phase::Finalize => "finalize",
        }
    }
}

/// Registration phase of a coordinator.
///
/// # Error Sink
///
/// Without [`set_error_sink`](Self::set_error_sink), every error raised
/// during the shutdown session is dropped. Nothing is logged on its behalf.
#[derive(Default)]
pub struct CoordinatorBuilder {
    triggers: Vec<Arc<dyn TriggerSource>>,
    cleanups: Vec<Arc<dyn CleanupAction>>,
    error_sink: Option<Box<dyn ErrorSink>>,
    cleanup_timeout: Option<Duration>,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger source. Sources are started in registration order.
    pub fn register_trigger<T: TriggerSource>(&mut self, trigger: T) -> &mut Self {
        self.triggers.push(Arc::new(trigger));
        self
    }

    /// Add a cleanup action.
    ///
    /// Registration order is kept but does not decide execution order: all
    /// actions run concurrently.
    pub fn register_cleanup<C: CleanupAction>(&mut self, action: C) -> &mut Self {
        self.cleanups.push(Arc::new(action));
        self
    }

    /// Install the error sink, replacing any previous one.
    pub fn set_error_sink<S: ErrorSink>(&mut self, sink: S) -> &mut Self {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// Bound how long the cleanup barrier waits.
    ///
    /// Unset by default: a cleanup action that never returns holds back
    /// `finalize` forever. When set and the deadline passes, the remaining
    /// actions are aborted, [`CoordinatorError::CleanupTimeout`] is reported
    /// to the sink and `finalize` runs.
    pub fn cleanup_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.cleanup_timeout = Some(timeout);
        self
    }

    /// Current state. Always [`CoordinatorState::Idle`] for a builder.
    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::Idle
    }

    /// Start every registered trigger source.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorError::TriggerStart` for the first source that
    /// fails to start. Sources started before it are stopped: the shared
    /// cancellation token is cancelled, which their listeners observe.
    pub fn start(self) -> CoordinatorResult<Coordinator> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoordinatorError::NoRuntime);
        }

        let (state, _) = watch::channel(CoordinatorState::Started);
        let coordinator = Coordinator {
            shared: Arc::new(Shared {
                triggers: self.triggers,
                cleanups: self.cleanups,
                error_sink: self.error_sink,
                cleanup_timeout: self.cleanup_timeout,
                gate: AtomicBool::new(false),
                state,
                cancellation_token: CancellationToken::new(),
                listeners: TaskTracker::new(),
            }),
        };

        for trigger in &coordinator.shared.triggers {
            if let Err(source) = Arc::clone(trigger).start(coordinator.clone()) {
                error!(
                    trigger = trigger.name(),
                    error = %source,
                    "Trigger source failed to start, stopping started listeners"
                );
                coordinator.shared.cancellation_token.cancel();
                coordinator.shared.listeners.close();
                return Err(CoordinatorError::TriggerStart {
                    trigger: trigger.name().to_string(),
                    source,
                });
            }
            debug!(trigger = trigger.name(), "Trigger source listening");
        }

        info!(
            triggers = coordinator.shared.triggers.len(),
            cleanups = coordinator.shared.cleanups.len(),
            cleanup_timeout = ?coordinator.shared.cleanup_timeout,
            "Shutdown coordinator started"
        );

        Ok(coordinator)
    }
}

impl std::fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("triggers", &trigger_names(&self.triggers))
            .field("cleanups", &self.cleanups.len())
            .field("error_sink", &self.error_sink.is_some())
            .field("cleanup_timeout", &self.cleanup_timeout)
            .finish()
    }
}

struct Shared {
    triggers: Vec<Arc<dyn TriggerSource>>,
    cleanups: Vec<Arc<dyn CleanupAction>>,
    error_sink: Option<Box<dyn ErrorSink>>,
    cleanup_timeout: Option<Duration>,
    /// Set by the one `begin_shutdown` call allowed to run the session.
    gate: AtomicBool,
    state: watch::Sender<CoordinatorState>,
    cancellation_token: CancellationToken,
    listeners: TaskTracker,
}

/// Handle to a started coordinator.
///
/// Cheap to clone; every clone refers to the same registries and the same
/// one-shot shutdown gate.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Run the shutdown session on behalf of `trigger`.
    ///
    /// Returns `true` if this call ran the session. Every other call, whether
    /// concurrent with the winner or after it, returns `false` at once
    /// without touching any hook or action.
    pub async fn begin_shutdown(&self, trigger: Arc<dyn TriggerSource>) -> bool {
        if self
            .shared
            .gate
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                trigger = trigger.name(),
                "Shutdown session already entered, ignoring trigger"
            );
            return false;
        }

        self.shared.state.send_replace(CoordinatorState::ShuttingDown);
        // Stop the other listeners; the gate already rejects their calls
        self.shared.cancellation_token.cancel();

        let session_id = Uuid::new_v4();
        let name = trigger.name().to_string();
        let started_at = Instant::now();
        metrics::record_sequence_started(&name);

        warn!(
            %session_id,
            trigger = %name,
            cleanups = self.shared.cleanups.len(),
            "Shutdown sequence started"
        );

        self.run_hook(Phase::PreShutdown, &name, trigger.pre_shutdown())
            .await;

        self.run_cleanups(&name, session_id).await;

        let elapsed = started_at.elapsed();
        metrics::record_sequence_duration(elapsed);
        info!(
            %session_id,
            trigger = %name,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cleanup phase finished, finalizing"
        );

        self.run_hook(Phase::Finalize, &name, trigger.finalize()).await;

        self.shared.state.send_replace(CoordinatorState::Terminated);
        info!(%session_id, trigger = %name, "Shutdown sequence complete");

        true
    }

    /// Run one trigger hook. A panic is reported like an error so the
    /// session still reaches `Terminated`.
    async fn run_hook<F>(&self, phase: Phase, trigger: &str, hook: F)
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        match AssertUnwindSafe(hook).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.report_phase_error(phase, trigger, err),
            Err(_panic) => self.report_phase_error(
                phase,
                trigger,
                CoordinatorError::HookPanicked {
                    trigger: trigger.to_string(),
                    phase: phase.as_str(),
                }
                .into(),
            ),
        }
    }

    /// Fan out every cleanup action and wait for all of them.
    async fn run_cleanups(&self, trigger: &str, session_id: Uuid) {
        let mut tasks = JoinSet::new();

        for action in self.shared.cleanups.iter().cloned() {
            let coordinator = self.clone();
            let trigger = trigger.to_string();

            tasks.spawn(async move {
                let label = action.label().to_string();
                let started_at = Instant::now();

                let outcome = AssertUnwindSafe(action.on_shutdown(&trigger))
                    .catch_unwind()
                    .await;
                let elapsed = started_at.elapsed();

                match outcome {
                    Ok(Ok(())) => {
                        metrics::record_cleanup("success", elapsed);
                        debug!(
                            %session_id,
                            cleanup = %label,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Cleanup action completed"
                        );
                    }
                    Ok(Err(err)) => {
                        metrics::record_cleanup("failure", elapsed);
                        coordinator.report_phase_error(Phase::Cleanup, &trigger, err);
                    }
                    Err(_panic) => {
                        metrics::record_cleanup("panic", elapsed);
                        coordinator.report_phase_error(
                            Phase::Cleanup,
                            &trigger,
                            CoordinatorError::CleanupPanicked { label }.into(),
                        );
                    }
                }
            });
        }

        let Some(timeout) = self.shared.cleanup_timeout else {
            drain(&mut tasks).await;
            return;
        };

        if tokio::time::timeout(timeout, drain(&mut tasks)).await.is_err() {
            // Reap actions that finished but were not joined yet
            while tasks.try_join_next().is_some() {}
            let pending = tasks.len();
            tasks.abort_all();
            self.report_phase_error(
                Phase::Cleanup,
                trigger,
                CoordinatorError::CleanupTimeout { timeout, pending }.into(),
            );
        }
    }

    fn report_phase_error(&self, phase: Phase, trigger: &str, err: anyhow::Error) {
        metrics::record_error(phase.as_str());
        warn!(
            phase = phase.as_str(),
            trigger,
            error = %err,
            "Shutdown step failed"
        );
        self.report_error(err);
    }

    /// Forward `err` to the error sink.
    ///
    /// The error is passed on unchanged. Without a sink it is dropped.
    pub fn report_error(&self, err: anyhow::Error) {
        if let Some(sink) = &self.shared.error_sink {
            sink.on_error(err);
        }
    }

    /// Spawn a trigger listener tracked by this coordinator.
    pub fn spawn_listener<F>(&self, listener: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.listeners.spawn(listener);
    }

    /// Token cancelled when listening should stop: once a session begins,
    /// when `start` aborts, or on [`stop_listening`](Self::stop_listening).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancellation_token.clone()
    }

    /// Whether listeners have been told to stop.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancellation_token.is_cancelled()
    }

    /// Stop every trigger listener without running a shutdown session and
    /// wait for them to exit.
    ///
    /// This does not close the gate: an explicit `begin_shutdown` call still
    /// runs the session.
    pub async fn stop_listening(&self) {
        self.shared.cancellation_token.cancel();
        self.shared.listeners.close();
        self.shared.listeners.wait().await;
        debug!("All trigger listeners have exited");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        *self.shared.state.borrow()
    }

    /// Wait until the shutdown session has completed.
    ///
    /// Never resolves if the firing trigger halts the process in `finalize`.
    pub async fn terminated(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `shared`, which `self` keeps alive
        let _ = rx
            .wait_for(|state| *state == CoordinatorState::Terminated)
            .await;
    }

    /// Names of the registered trigger sources, in registration order.
    pub fn trigger_names(&self) -> Vec<String> {
        trigger_names(&self.shared.triggers)
    }

    /// Number of registered cleanup actions.
    pub fn cleanup_count(&self) -> usize {
        self.shared.cleanups.len()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .field("triggers", &self.trigger_names())
            .field("cleanups", &self.cleanup_count())
            .field("error_sink", &self.shared.error_sink.is_some())
            .finish()
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            // Panics are caught inside the task, so this is an abort
            debug!(error = %e, "Cleanup task did not run to completion");
        }
    }
}

fn trigger_names(triggers: &[Arc<dyn TriggerSource>]) -> Vec<String> {
    triggers.iter().map(|t| t.name().to_string()).collect()
}
