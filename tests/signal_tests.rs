//! OS signal delivery through `SignalTrigger`.
//!
//! Kept in its own test binary: signals are process-wide, so no other test
//! may listen for the signals raised here.
//!
//! Run with: `cargo test --test signal_tests`
#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use shutdown_coordinator::cleanup::teardown;
use shutdown_coordinator::trigger::signal::NAME;
use shutdown_coordinator::{CleanupFn, CoordinatorBuilder, CoordinatorState, Signal, SignalTrigger};

fn send(signal: &str, pid: u32) {
    let status = Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}

fn send_to_self(signal: &str) {
    send(signal, std::process::id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_signal_fires_shutdown_sequence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let trigger_names = Arc::new(std::sync::Mutex::new(Vec::new()));

    let calls_clone = calls.clone();
    let names_clone = trigger_names.clone();
    let mut builder = CoordinatorBuilder::new();
    builder
        .register_trigger(SignalTrigger::new([Signal::User1]).non_exiting())
        .register_cleanup(teardown("counter", move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .register_cleanup(CleanupFn::new("names", move |trigger| {
            let names = names_clone.clone();
            async move {
                names.lock().unwrap().push(trigger);
                Ok(())
            }
        }));

    let coordinator = builder.start().unwrap();
    assert_eq!(coordinator.state(), CoordinatorState::Started);

    // Handlers are installed by `start`, so the signal cannot be missed
    send_to_self("USR1");

    tokio::time::timeout(Duration::from_secs(5), coordinator.terminated())
        .await
        .expect("SIGUSR1 should complete the shutdown sequence");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*trigger_names.lock().unwrap(), vec![NAME.to_string()]);

    // A repeated signal does not start another session
    send_to_self("USR1");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sigterm_exits_binary_with_status_zero() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_shutdown-coordinator"))
        .env("RUST_LOG", "info")
        .env("SHUTDOWN_SIGNALS", "int,term")
        .env("METRICS_PORT", "0")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn demo binary");

    // Handlers are installed before this line is logged
    let stdout = child.stdout.take().expect("stdout is piped");
    let mut lines = BufReader::new(stdout).lines();
    let ready = lines.any(|line| line.is_ok_and(|l| l.contains("Running, send SIGINT or SIGTERM")));
    assert!(ready, "binary exited before it was ready");

    send("TERM", child.id());

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if std::time::Instant::now() > deadline {
            child.kill().unwrap();
            panic!("binary did not exit after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    assert_eq!(status.code(), Some(exitcode::OK));
}
