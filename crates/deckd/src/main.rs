mod control;
mod exec;
mod scanner;

use anyhow::Context;
use clap::Parser;
use deck_registry::{spawn_liveness_monitor, ActionExecutor, DeviceService};
use deck_storage::FileConfigStore;
use exec::CommandExecutor;
use scanner::ScannerProcess;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deckd", about = "Device registry daemon for GPIO deck controllers")]
struct Args {
    /// Scanner command line, whitespace-separated (e.g. "python3 scanner.py").
    #[arg(long)]
    scanner: String,
    /// Hotkey executor command line; invoked as `<cmd> <hotkey> <hold-seconds>`.
    #[arg(long, default_value = "")]
    hotkey_cmd: String,
    /// Directory holding one JSON config document per device id.
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,
    /// Control socket path. Defaults to $XDG_RUNTIME_DIR/deckd.sock.
    #[arg(long)]
    socket: Option<PathBuf>,
    /// Liveness timeout in seconds before a silent device is presumed lost.
    #[arg(long, default_value_t = 15)]
    stale_seconds: u64,
    /// Liveness sweep period in seconds.
    #[arg(long, default_value_t = 5)]
    sweep_seconds: u64,
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn default_socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("deckd.sock")
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let scanner_command = split_command(&args.scanner);
    anyhow::ensure!(!scanner_command.is_empty(), "--scanner must not be empty");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let scanner = Arc::new(ScannerProcess::new(scanner_command, events_tx));
    let backend = Arc::new(FileConfigStore::new(&args.config_dir));
    let service = Arc::new(DeviceService::new(backend, scanner));
    let executor: Arc<dyn ActionExecutor> =
        Arc::new(CommandExecutor::new(split_command(&args.hotkey_cmd)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pump_service = service.clone();
    let event_pump = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            pump_service.apply_event(event).await;
        }
        info!(event = "event_pump_stopped");
    });

    let monitor = spawn_liveness_monitor(
        service.registry().clone(),
        Duration::from_secs(args.sweep_seconds),
        Duration::from_secs(args.stale_seconds),
        shutdown_rx.clone(),
    );

    let socket_path = args.socket.unwrap_or_else(default_socket_path);
    let control = tokio::spawn(control::run(
        socket_path.clone(),
        service.clone(),
        executor,
        shutdown_rx,
    ));

    // Bootstrap: scanning starts with the session. A rejected start is not
    // fatal; a control client can retry.
    if let Err(err) = service.session().start().await {
        error!(event = "bootstrap_scan_failed", error = %err);
    }

    info!(
        event = "deckd_started",
        socket = %socket_path.display(),
        config_dir = %args.config_dir.display(),
        stale_seconds = args.stale_seconds,
        sweep_seconds = args.sweep_seconds,
    );

    shutdown_signal().await;
    info!(event = "deckd_shutting_down");

    let _ = shutdown_tx.send(true);
    service.session().shutdown().await;

    if let Err(err) = monitor.await {
        warn!(event = "liveness_monitor_join_failed", error = %err);
    }
    match control.await {
        Ok(result) => result.context("control socket server failed")?,
        Err(err) => warn!(event = "control_server_join_failed", error = %err),
    }
    event_pump.abort();

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
