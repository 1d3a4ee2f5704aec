use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use slotstore_core::{SlotStore, StoreConfig};
use slotstore_relay::RelayConfig;
use tracing::info;

use crate::gateway::{Gateway, GatewayServer, LocalService};
use crate::topology::error::{Result, TopologyError};

/// Single-process mode: one gateway in the primary over a private region.
///
/// No owners, no relay and no children; the gateway calls the store
/// directly.
pub fn run_standalone(
    runtime_dir: &Path,
    store: StoreConfig,
    running: &AtomicBool,
) -> Result<()> {
    std::fs::create_dir_all(runtime_dir).map_err(|source| TopologyError::RuntimeDir {
        path: runtime_dir.to_path_buf(),
        source,
    })?;

    let limit = RelayConfig::default().payload_limit_for(&store);
    let store = SlotStore::anonymous(store)?;
    let gateway = Arc::new(Gateway::new(LocalService::new(store))?);
    let server = GatewayServer::bind(crate::topology::config::frontend_socket(runtime_dir, 0))?
        .with_max_payload_size(limit);
    info!(path = %server.path().display(), "standalone store ready");

    server.serve(gateway, running)?;
    Ok(())
}
