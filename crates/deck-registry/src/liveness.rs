//! Periodic liveness sweep.
//!
//! The producer may simply stop emitting without an explicit disconnect
//! (radio range loss, crash), so the registry demotes devices on silence.
//! This passive timeout is the only self-healing mechanism in the core;
//! there is no active reconnection.

use crate::registry::DeviceRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Maximum silence tolerated before a connected device is presumed lost.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed sweep period.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(5);

/// Runs the sweep on a fixed period until the shutdown channel flips.
pub fn spawn_liveness_monitor(
    registry: Arc<DeviceRegistry>,
    period: Duration,
    timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let demoted = registry.sweep_stale(Instant::now(), timeout).await;
                    if !demoted.is_empty() {
                        debug!(event = "liveness_sweep", demoted = demoted.len());
                    }
                }
            }
        }
        debug!(event = "liveness_monitor_stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn monitor_stops_on_shutdown_signal() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, rx) = watch::channel(false);
        let handle = spawn_liveness_monitor(
            registry,
            Duration::from_millis(10),
            LIVENESS_TIMEOUT,
            rx,
        );

        tx.send(true).expect("signal shutdown");
        handle.await.expect("monitor task joins");
    }

    #[tokio::test]
    async fn monitor_demotes_silent_device() {
        let registry = Arc::new(DeviceRegistry::new());
        registry
            .apply_telemetry("AA:BB:CC:DD:EE:01", None, vec![0; 16])
            .await;

        let (tx, rx) = watch::channel(false);
        let handle = spawn_liveness_monitor(
            registry.clone(),
            Duration::from_millis(20),
            Duration::from_millis(50),
            rx,
        );

        // Wall-clock silence past the (shortened) timeout, then a few sweeps.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = registry.get("AA:BB:CC:DD:EE:01").await.expect("record");
        assert!(!state.connected);

        tx.send(true).expect("signal shutdown");
        handle.await.expect("monitor task joins");
    }
}
