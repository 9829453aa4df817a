//! Bridge to the out-of-process scanner.
//!
//! The scanner is an external program that discovers devices and prints
//! newline-delimited JSON on stdout. Start spawns it and pumps its output
//! through the normalizer into the event channel; stop kills it. A start
//! while a child is still alive replaces that child.

use async_trait::async_trait;
use deck_core::scanner::{classify_line, DeviceEvent};
use deck_registry::{ScanControl, ScanError};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

pub struct ScannerProcess {
    command: Vec<String>,
    events: mpsc::UnboundedSender<DeviceEvent>,
    child: Mutex<Option<Child>>,
}

impl ScannerProcess {
    pub fn new(command: Vec<String>, events: mpsc::UnboundedSender<DeviceEvent>) -> Self {
        Self {
            command,
            events,
            child: Mutex::new(None),
        }
    }

    fn spawn_child(&self) -> Result<Child, ScanError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ScanError::Control("empty scanner command".to_string()))?;
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ScanError::Control(format!("failed to spawn scanner: {err}")))
    }
}

#[async_trait]
impl ScanControl for ScannerProcess {
    async fn start(&self) -> Result<(), ScanError> {
        let mut slot = self.child.lock().await;
        if let Some(mut previous) = slot.take() {
            let _ = previous.kill().await;
            debug!(event = "scanner_previous_child_killed");
        }

        let mut child = self.spawn_child()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScanError::Control("scanner stdout not captured".to_string()))?;
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                // Non-JSON lines are producer noise, dropped without error.
                if let Some(event) = classify_line(&line) {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
            info!(event = "scanner_stream_ended");
        });

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(event = "scanner_stderr", line);
                }
            });
        }

        info!(event = "scanner_started", command = self.command.join(" "));
        *slot = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ScanError> {
        let mut slot = self.child.lock().await;
        if let Some(mut child) = slot.take() {
            child
                .kill()
                .await
                .map_err(|err| ScanError::Control(format!("failed to stop scanner: {err}")))?;
            info!(event = "scanner_stopped");
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_scanner(script: &str, events: mpsc::UnboundedSender<DeviceEvent>) -> ScannerProcess {
        ScannerProcess::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            events,
        )
    }

    #[tokio::test]
    async fn pumps_classified_events_from_child_stdout() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let script = concat!(
            "echo '{\"address\":\"AA:BB\",\"gpio_states\":[1,0]}'; ",
            "echo 'not json'; ",
            "echo '{\"event\":\"device_disconnected\",\"address\":\"AA:BB\"}'",
        );
        let scanner = shell_scanner(script, tx);
        scanner.start().await.expect("start");

        let first = rx.recv().await.expect("telemetry event");
        assert!(matches!(first, DeviceEvent::Telemetry { .. }));
        let second = rx.recv().await.expect("disconnect event");
        assert_eq!(
            second,
            DeviceEvent::Disconnected {
                address: "AA:BB".to_string()
            }
        );

        scanner.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scanner = shell_scanner("sleep 5", tx);
        scanner.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn unspawnable_command_surfaces_scan_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scanner = ScannerProcess::new(
            vec!["/nonexistent/scanner-binary".to_string()],
            tx,
        );
        let err = scanner.start().await.expect_err("start must fail");
        assert!(matches!(err, ScanError::Control(_)));
    }
}
