//! Device registry and configuration synchronization core.
//!
//! `DeviceService` is the single state-store object: it owns the registry,
//! the config cache, and the scan session, and is constructed once and
//! injected (as an `Arc`) into whatever feeds it events or serves clients.
//! All mutation happens through normalized events and explicit user actions.

pub mod cache;
pub mod liveness;
pub mod registry;
pub mod session;

pub use cache::ConfigCache;
pub use liveness::{spawn_liveness_monitor, LIVENESS_TIMEOUT, SWEEP_PERIOD};
pub use registry::DeviceRegistry;
pub use session::{ScanControl, ScanError, ScanState, SessionController};

use async_trait::async_trait;
use deck_core::scanner::DeviceEvent;
use deck_storage::ConfigBackend;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("action execution failed: {0}")]
    Failed(String),
}

/// Boundary to the backend that performs keystrokes/media keys. Consumed
/// only by the interactive hotkey test path.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &str, hold_duration: f64) -> Result<(), ExecutionError>;
}

pub struct DeviceService {
    registry: Arc<DeviceRegistry>,
    configs: ConfigCache,
    session: SessionController,
}

impl DeviceService {
    pub fn new(backend: Arc<dyn ConfigBackend>, scanner: Arc<dyn ScanControl>) -> Self {
        Self {
            registry: Arc::new(DeviceRegistry::new()),
            configs: ConfigCache::new(backend),
            session: SessionController::new(scanner),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn configs(&self) -> &ConfigCache {
        &self.configs
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Routes one normalized event into the registry. Never fails: error
    /// and malformed events are logged and dropped by policy.
    pub async fn apply_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Telemetry {
                address,
                name,
                gpio_states,
            } => {
                self.registry
                    .apply_telemetry(&address, name, gpio_states)
                    .await;
            }
            // Informational only; telemetry is what sets `connected`.
            DeviceEvent::Connected { address, name } => {
                info!(
                    event = "scanner_device_connected",
                    address,
                    name = name.as_deref().unwrap_or_default()
                );
            }
            DeviceEvent::Disconnected { address } => {
                self.registry.apply_disconnected(&address).await;
            }
            DeviceEvent::Error { reason } => {
                warn!(event = "scanner_error", reason);
            }
            DeviceEvent::Malformed => {
                debug!(event = "scanner_message_dropped");
            }
        }
    }

    /// Selects the current device and lazily loads its config. Failures of
    /// this implicit load are logged, not surfaced; an explicit `load`
    /// through the cache still reports them.
    pub async fn select_device(&self, address: &str) {
        self.registry.select(address).await;
        if let Err(err) = self.configs.ensure_loaded(address).await {
            warn!(event = "config_autoload_failed", address, error = %err);
        }
    }
}
