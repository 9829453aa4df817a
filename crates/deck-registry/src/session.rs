//! Scan session lifecycle.
//!
//! The controller guards an external scanner behind an {Idle, Scanning}
//! state machine. The external transport is idempotent on its own, but the
//! controller enforces the start-once guard above it and always pushes a
//! stop through, to recover from desynchronization with the external
//! process.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("scan control failure: {0}")]
    Control(String),
}

/// External scanner boundary. Implementations own process or transport
/// details; the controller only sees start/stop.
#[async_trait]
pub trait ScanControl: Send + Sync {
    async fn start(&self) -> Result<(), ScanError>;
    async fn stop(&self) -> Result<(), ScanError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

pub struct SessionController {
    scanner: std::sync::Arc<dyn ScanControl>,
    state: Mutex<ScanState>,
}

impl SessionController {
    pub fn new(scanner: std::sync::Arc<dyn ScanControl>) -> Self {
        Self {
            scanner,
            state: Mutex::new(ScanState::Idle),
        }
    }

    pub async fn state(&self) -> ScanState {
        *self.state.lock().await
    }

    pub async fn is_scanning(&self) -> bool {
        self.state().await == ScanState::Scanning
    }

    /// Starts scanning. No-op when already scanning; on rejection by the
    /// external scanner the controller stays Idle and the failure surfaces.
    pub async fn start(&self) -> Result<(), ScanError> {
        let mut state = self.state.lock().await;
        if *state == ScanState::Scanning {
            debug!(event = "scan_start_ignored_already_scanning");
            return Ok(());
        }
        self.scanner.start().await?;
        *state = ScanState::Scanning;
        info!(event = "scan_started");
        Ok(())
    }

    /// Stops scanning. The external stop is attempted even when the
    /// controller believes it is idle.
    pub async fn stop(&self) -> Result<(), ScanError> {
        let mut state = self.state.lock().await;
        let result = self.scanner.stop().await;
        *state = ScanState::Idle;
        if result.is_ok() {
            info!(event = "scan_stopped");
        }
        result
    }

    /// Teardown path: best-effort stop, failures logged only.
    pub async fn shutdown(&self) {
        if let Err(err) = self.stop().await {
            warn!(event = "scan_stop_failed_on_shutdown", error = %err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingScanner {
        starts: AtomicUsize,
        stops: AtomicUsize,
        reject_start: AtomicBool,
    }

    #[async_trait]
    impl ScanControl for CountingScanner {
        async fn start(&self) -> Result<(), ScanError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.reject_start.load(Ordering::SeqCst) {
                Err(ScanError::Control("spawn failed".to_string()))
            } else {
                Ok(())
            }
        }

        async fn stop(&self) -> Result<(), ScanError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_start_issues_external_call_at_most_once() {
        let scanner = Arc::new(CountingScanner::default());
        let session = SessionController::new(scanner.clone());

        session.start().await.expect("first start");
        session.start().await.expect("second start is a no-op");

        assert_eq!(scanner.starts.load(Ordering::SeqCst), 1);
        assert!(session.is_scanning().await);
    }

    #[tokio::test]
    async fn rejected_start_reverts_to_idle() {
        let scanner = Arc::new(CountingScanner::default());
        scanner.reject_start.store(true, Ordering::SeqCst);
        let session = SessionController::new(scanner.clone());

        let err = session.start().await.expect_err("start must fail");
        assert!(matches!(err, ScanError::Control(_)));
        assert_eq!(session.state().await, ScanState::Idle);

        // A later start may try again.
        scanner.reject_start.store(false, Ordering::SeqCst);
        session.start().await.expect("retry succeeds");
        assert_eq!(scanner.starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stop_always_reaches_the_external_scanner() {
        let scanner = Arc::new(CountingScanner::default());
        let session = SessionController::new(scanner.clone());

        // Believed idle, stop still goes through.
        session.stop().await.expect("stop while idle");
        assert_eq!(scanner.stops.load(Ordering::SeqCst), 1);

        session.start().await.expect("start");
        session.stop().await.expect("stop");
        assert_eq!(scanner.stops.load(Ordering::SeqCst), 2);
        assert_eq!(session.state().await, ScanState::Idle);
    }

    #[tokio::test]
    async fn shutdown_is_best_effort() {
        struct FailingStop;

        #[async_trait]
        impl ScanControl for FailingStop {
            async fn start(&self) -> Result<(), ScanError> {
                Ok(())
            }
            async fn stop(&self) -> Result<(), ScanError> {
                Err(ScanError::Control("gone".to_string()))
            }
        }

        let session = SessionController::new(Arc::new(FailingStop));
        session.start().await.expect("start");
        // Must not panic or propagate.
        session.shutdown().await;
        assert_eq!(session.state().await, ScanState::Idle);
    }
}
