//! Hotkey execution boundary.
//!
//! The daemon does not synthesize keystrokes itself; it delegates to a
//! configurable external command invoked as `<cmd> <hotkey> <hold-seconds>`.

use async_trait::async_trait;
use deck_registry::{ActionExecutor, ExecutionError};
use tokio::process::Command;
use tracing::debug;

pub struct CommandExecutor {
    command: Vec<String>,
}

impl CommandExecutor {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ActionExecutor for CommandExecutor {
    async fn execute(&self, action: &str, hold_duration: f64) -> Result<(), ExecutionError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ExecutionError::Failed("no hotkey executor configured".to_string()))?;

        debug!(event = "hotkey_execute", action, hold_duration);
        let output = Command::new(program)
            .args(args)
            .arg(action)
            .arg(hold_duration.to_string())
            .output()
            .await
            .map_err(|err| ExecutionError::Failed(format!("executor spawn failed: {err}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ExecutionError::Failed(format!(
                "executor exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}
