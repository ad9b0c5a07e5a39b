//! Coordinator lifecycle states.
//!
//! ```text
//! ┌────────┐  start()  ┌─────────┐  first begin_shutdown  ┌──────────────┐  finalize returns  ┌────────────┐
//! │  Idle  │ ────────► │ Started │ ─────────────────────► │ ShuttingDown │ ─────────────────► │ Terminated │
//! │(builder)│          └─────────┘                        └──────────────┘                    └────────────┘
//! └────────┘
//! ```
//!
//! `Idle` is only ever observed on a [`CoordinatorBuilder`](crate::CoordinatorBuilder);
//! a [`Coordinator`](crate::Coordinator) handle starts out in `Started`.
//! There is no edge back out of `ShuttingDown` or `Terminated`.

/// Lifecycle state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Registration phase - trigger sources not yet listening.
    Idle,
    /// Trigger sources are listening.
    Started,
    /// A shutdown session is running.
    ShuttingDown,
    /// The shutdown session finished and `finalize` returned.
    ///
    /// Halting triggers exit the process before this state can be observed.
    Terminated,
}

impl CoordinatorState {
    /// Whether a shutdown session has been entered.
    pub fn is_shutting_down(&self) -> bool {
        matches!(
            self,
            CoordinatorState::ShuttingDown | CoordinatorState::Terminated
        )
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "idle"),
            CoordinatorState::Started => write!(f, "started"),
            CoordinatorState::ShuttingDown => write!(f, "shutting-down"),
            CoordinatorState::Terminated => write!(f, "terminated"),
        }
    }
}
