use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shutdown_coordinator::cleanup::{CleanupFn, teardown};
use shutdown_coordinator::{
    BackgroundTasks, CoordinatorBuilder, LogErrorSink, ShutdownConfig, SignalTrigger, metrics,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(
        "Starting shutdown coordinator demo v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the service, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    let config = ShutdownConfig::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        signals = ?config.signals,
        cleanup_timeout = ?config.cleanup_timeout,
        heartbeat_interval = ?config.heartbeat_interval,
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_addr() {
        metrics::init_metrics(addr).map_err(|e| {
            error!("Failed to start metrics exporter: {e}");
            exitcode::UNAVAILABLE
        })?;
    }

    let tasks = BackgroundTasks::new();
    tasks.spawn_periodic("heartbeat", config.heartbeat_interval, || async {
        info!("Heartbeat: service running");
    });

    let mut builder = CoordinatorBuilder::new();
    builder
        .register_trigger(SignalTrigger::new(config.signals.clone()))
        .register_cleanup(tasks.cleanup_action())
        .register_cleanup(CleanupFn::new("shutdown-notice", |trigger| async move {
            info!(%trigger, "Shutdown requested, refusing new work");
            Ok(())
        }))
        .register_cleanup(teardown("flush-logs", || async {
            info!("Flushing buffered state");
            Ok(())
        }))
        .set_error_sink(LogErrorSink);

    if let Some(timeout) = config.cleanup_timeout {
        builder.cleanup_timeout(timeout);
    }

    let coordinator = builder.start().map_err(|e| {
        error!("Failed to start shutdown coordinator: {e}");
        exitcode::SOFTWARE
    })?;

    info!(
        triggers = ?coordinator.trigger_names(),
        cleanups = coordinator.cleanup_count(),
        "Running, send SIGINT or SIGTERM to stop"
    );

    // The signal trigger exits the process from `finalize`
    coordinator.terminated().await;

    info!("Shutdown complete");
    Ok(())
}
