//! OS signal trigger.
//!
//! Listens for a configured set of termination signals (interrupt and
//! terminate by default). The first one delivered starts the shutdown
//! session; `finalize` then exits the process with status 0.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::select_all;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::trigger::TriggerSource;

/// Name reported to cleanup actions when a signal fires.
pub const NAME: &str = "os-signal";

/// Signals listened for when none are configured.
pub const DEFAULT_SIGNALS: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

/// Asynchronous termination signals a [`SignalTrigger`] can listen for.
///
/// Only [`Signal::Interrupt`] is available on non-unix platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGQUIT
    Quit,
    /// SIGHUP
    Hangup,
    /// SIGUSR1
    User1,
    /// SIGUSR2
    User2,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `int`, `interrupt`, `sigint`, `SIGINT` and the like.
impl FromStr for Signal {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("sig").unwrap_or(&normalized);

        match name {
            "int" | "interrupt" => Ok(Signal::Interrupt),
            "term" | "terminate" => Ok(Signal::Terminate),
            "quit" => Ok(Signal::Quit),
            "hup" | "hangup" => Ok(Signal::Hangup),
            "usr1" => Ok(Signal::User1),
            "usr2" => Ok(Signal::User2),
            _ => Err(CoordinatorError::Config(format!("Unknown signal: {s}"))),
        }
    }
}

type SignalWait = Pin<Box<dyn Future<Output = Signal> + Send>>;

/// Trigger source fired by OS signals.
///
/// # Finalize
///
/// By default `finalize` calls [`std::process::exit`] with
/// [`exitcode::OK`]. Use [`non_exiting`](Self::non_exiting) when the process
/// must keep running after the session, e.g. in tests.
///
/// # Handlers Stay Installed
///
/// Tokio never uninstalls a signal handler. Once the listener stops (a
/// session began, or [`CoordinatorBuilder::start`](crate::CoordinatorBuilder::start)
/// aborted) the configured signals are still caught but nothing reacts to
/// them. With a non-exiting trigger, or after a failed start, a later Ctrl+C
/// no longer terminates the process.
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    signals: Vec<Signal>,
    exit_on_finalize: bool,
}

impl SignalTrigger {
    /// Listen for `signals`. An empty set means [`DEFAULT_SIGNALS`].
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        let mut unique: Vec<Signal> = Vec::new();
        for signal in signals {
            if !unique.contains(&signal) {
                unique.push(signal);
            }
        }
        if unique.is_empty() {
            unique.extend(DEFAULT_SIGNALS);
        }

        Self {
            signals: unique,
            exit_on_finalize: true,
        }
    }

    /// Return from `finalize` instead of exiting the process.
    #[must_use]
    pub fn non_exiting(mut self) -> Self {
        self.exit_on_finalize = false;
        self
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn exits_on_finalize(&self) -> bool {
        self.exit_on_finalize
    }
}

impl Default for SignalTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNALS)
    }
}

#[async_trait]
impl TriggerSource for SignalTrigger {
    fn name(&self) -> &str {
        NAME
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> anyhow::Result<()> {
        // Install every handler before spawning so a failure surfaces here
        let waits = self
            .signals
            .iter()
            .map(|signal| wait_for(*signal))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let token = coordinator.cancellation_token();
        let handle = coordinator.clone();
        let trigger: Arc<dyn TriggerSource> = self.clone();

        coordinator.spawn_listener(async move {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    debug!(trigger = NAME, "Signal listener received cancellation");
                }
                (signal, _, _) = select_all(waits) => {
                    warn!(%signal, "Received {signal}, initiating graceful shutdown...");
                    handle.begin_shutdown(trigger).await;
                }
            }
        });

        debug!(signals = ?self.signals, "Listening for shutdown signals");
        Ok(())
    }

    async fn finalize(&self) -> anyhow::Result<()> {
        if self.exit_on_finalize {
            info!(code = exitcode::OK, "Shutdown complete, exiting process");
            std::process::exit(exitcode::OK);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn wait_for(signal: Signal) -> anyhow::Result<SignalWait> {
    use anyhow::Context;

    let mut stream = tokio::signal::unix::signal(signal.kind())
        .with_context(|| format!("failed to install {signal} handler"))?;

    Ok(Box::pin(async move {
        if stream.recv().await.is_none() {
            // Signal driver gone; never fire from here
            warn!(%signal, "Signal stream closed");
            std::future::pending::<()>().await;
        }
        signal
    }))
}

#[cfg(not(unix))]
fn wait_for(signal: Signal) -> anyhow::Result<SignalWait> {
    match signal {
        Signal::Interrupt => Ok(Box::pin(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            signal
        })),
        other => Err(CoordinatorError::UnsupportedSignal(other.to_string()).into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_signals() {
        let trigger = SignalTrigger::default();
        assert_eq!(trigger.signals(), &[Signal::Interrupt, Signal::Terminate]);
        assert!(trigger.exits_on_finalize());
    }

    #[test]
    fn test_empty_set_falls_back_to_defaults() {
        let trigger = SignalTrigger::new(Vec::new());
        assert_eq!(trigger.signals(), &DEFAULT_SIGNALS);
    }

    #[test]
    fn test_duplicates_are_removed() {
        let trigger = SignalTrigger::new([Signal::Quit, Signal::Quit, Signal::Terminate]);
        assert_eq!(trigger.signals(), &[Signal::Quit, Signal::Terminate]);
    }

    #[test]
    fn test_non_exiting() {
        let trigger = SignalTrigger::default().non_exiting();
        assert!(!trigger.exits_on_finalize());
    }

    #[test]
    fn test_signal_from_str() {
        assert_eq!("int".parse::<Signal>().unwrap(), Signal::Interrupt);
        assert_eq!("SIGTERM".parse::<Signal>().unwrap(), Signal::Terminate);
        assert_eq!(" hup ".parse::<Signal>().unwrap(), Signal::Hangup);
        assert_eq!("sigusr2".parse::<Signal>().unwrap(), Signal::User2);
        assert!("sigkill".parse::<Signal>().is_err());
    }

    #[tokio::test]
    async fn test_non_exiting_finalize_returns() {
        let trigger = SignalTrigger::default().non_exiting();
        assert!(trigger.finalize().await.is_ok());
        assert!(trigger.pre_shutdown().await.is_ok());
        assert_eq!(trigger.name(), NAME);
    }
}
