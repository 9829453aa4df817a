//! Control socket for UI clients.
//!
//! Newline-delimited JSON request/response over a Unix socket. One response
//! per request line, correlated by the optional client-chosen `id`. This is
//! the interface boundary a UI talks to; no rendering lives here.

use deck_core::action::GpioAction;
use deck_core::control::{
    ControlOp, ControlRequest, ControlResponse, ControlResult, SnapshotPayload,
};
use deck_registry::{ActionExecutor, DeviceService};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::{fs, os::unix::fs::PermissionsExt};
#[cfg(unix)]
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
};

#[cfg(not(unix))]
pub async fn run(
    _socket_path: PathBuf,
    _service: Arc<DeviceService>,
    _executor: Arc<dyn ActionExecutor>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let _ = shutdown.changed().await;
    Ok(())
}

#[cfg(unix)]
pub async fn run(
    socket_path: PathBuf,
    service: Arc<DeviceService>,
    executor: Arc<dyn ActionExecutor>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if socket_path.exists() {
        let _ = fs::remove_file(&socket_path);
    }

    let listener = UnixListener::bind(&socket_path)?;
    let _ = fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o600));
    info!(event = "control_socket_listening", socket = %socket_path.display());

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accept = listener.accept() => {
                match accept {
                    Ok((stream, _addr)) => {
                        let service = service.clone();
                        let executor = executor.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, service, executor).await {
                                debug!(event = "control_connection_closed", error = %err);
                            }
                        });
                    }
                    Err(err) => {
                        warn!(event = "control_accept_error", error = %err);
                    }
                }
            }
        }
    }

    let _ = fs::remove_file(&socket_path);
    info!(event = "control_socket_closed");
    Ok(())
}

#[cfg(unix)]
async fn handle_connection(
    stream: UnixStream,
    service: Arc<DeviceService>,
    executor: Arc<dyn ActionExecutor>,
) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => dispatch(&service, executor.as_ref(), request).await,
            Err(err) => ControlResponse::error(None, format!("bad request: {err}")),
        };
        let mut body = serde_json::to_vec(&response)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        body.push(b'\n');
        write_half.write_all(&body).await?;
    }
    Ok(())
}

async fn dispatch(
    service: &DeviceService,
    executor: &dyn ActionExecutor,
    request: ControlRequest,
) -> ControlResponse {
    let id = request.id;
    match request.op {
        ControlOp::StartScan => match service.session().start().await {
            Ok(()) => ControlResponse::ok(id),
            Err(err) => ControlResponse::error(id, err.to_string()),
        },
        ControlOp::StopScan => match service.session().stop().await {
            Ok(()) => ControlResponse::ok(id),
            Err(err) => ControlResponse::error(id, err.to_string()),
        },
        ControlOp::Snapshot => ControlResponse {
            id,
            result: ControlResult::Snapshot(SnapshotPayload {
                devices: service.registry().snapshot().await,
                current_device: service.registry().current_device().await,
                scanning: service.session().is_scanning().await,
            }),
        },
        ControlOp::SelectDevice(device) => {
            service.select_device(&device.address).await;
            ControlResponse::ok(id)
        }
        ControlOp::AddDevice(device) => {
            if service.registry().mark_added(&device.address).await {
                ControlResponse::ok(id)
            } else {
                ControlResponse::error(id, format!("unknown device: {}", device.address))
            }
        }
        ControlOp::LoadConfig(device) => match service.configs().load(&device.address).await {
            Ok(config) => ControlResponse {
                id,
                result: ControlResult::Config(config),
            },
            Err(err) => ControlResponse::error(id, err.to_string()),
        },
        ControlOp::SaveConfig(payload) => {
            match service.configs().save(&payload.address, payload.update).await {
                Ok(config) => ControlResponse {
                    id,
                    result: ControlResult::Config(config),
                },
                Err(err) => ControlResponse::error(id, err.to_string()),
            }
        }
        ControlOp::TestHotkey(payload) => {
            let action = GpioAction {
                kind: payload.kind,
                action: payload.action,
                hold_duration: payload.hold_duration,
                label: None,
            };
            match action.resolve_hotkey() {
                Ok(hotkey) => {
                    debug!(event = "hotkey_test", kind = action.kind.as_str(), hotkey);
                    match executor
                        .execute(&hotkey, action.hold_duration_or_default())
                        .await
                    {
                        Ok(()) => ControlResponse::ok(id),
                        Err(err) => ControlResponse::error(id, err.to_string()),
                    }
                }
                Err(err) => ControlResponse::error(id, err.to_string()),
            }
        }
    }
}
