use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use slotstore_core::StoreConfig;
use slotstore_relay::{RelayClient, RelayConfig};
use tracing::{info, warn};

use crate::gateway::{Gateway, GatewayServer};
use crate::topology::error::{Result, TopologyError};

/// How long a fresh front-end keeps retrying its relay socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one front-end process.
#[derive(Debug, Clone)]
pub struct FrontendOptions {
    pub slot: usize,
    /// Relay socket of the paired store owner.
    pub relay_socket: PathBuf,
    /// Gateway socket to serve callers on.
    pub listen_socket: PathBuf,
    pub relay: RelayConfig,
    pub connect_timeout: Duration,
}

/// Run a front-end until its relay connection drops or `running` turns
/// false.
///
/// Losing the relay is an error: the supervisor replaces the process and the
/// replacement attaches with a fresh connection.
pub fn run_frontend(options: &FrontendOptions, running: Arc<AtomicBool>) -> Result<()> {
    let client = Arc::new(RelayClient::connect_with_retry(
        &options.relay_socket,
        options.slot,
        &options.relay,
        options.connect_timeout,
    )?);
    info!(
        slot = options.slot,
        owner = client.hello().owner,
        "front-end attached to store owner"
    );

    let watcher_client = Arc::clone(&client);
    let watcher_running = Arc::clone(&running);
    thread::Builder::new()
        .name("relay-watch".to_string())
        .spawn(move || {
            let reason = watcher_client.wait_disconnected();
            warn!(reason = %reason, "relay connection lost");
            watcher_running.store(false, Ordering::SeqCst);
        })
        .map_err(|source| TopologyError::Spawn {
            name: "relay-watch".to_string(),
            source,
        })?;

    let gateway = Arc::new(Gateway::new(Arc::clone(&client))?);
    let hello = client.hello();
    let limit = options.relay.payload_limit_for(&StoreConfig {
        capacity: hello.capacity,
        slot_width: hello.slot_width,
    });
    let server = GatewayServer::bind(&options.listen_socket)?.with_max_payload_size(limit);
    server.serve(gateway, &running)?;

    if client.is_closed() {
        return Err(TopologyError::RelayLost(client.wait_disconnected()));
    }
    info!(slot = options.slot, "front-end stopped");
    Ok(())
}
