use std::path::{Path, PathBuf};
use std::time::Duration;

use slotstore_core::StoreConfig;
use slotstore_relay::RelayConfig;

/// File name of the region backing file inside the runtime directory.
pub const REGION_FILE: &str = "store.region";

/// Default restart back-off per topology slot.
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_millis(250);

/// Everything the primary needs to lay out and supervise a cluster.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Directory holding the region file and all sockets.
    pub runtime_dir: PathBuf,
    /// Number of front-end / owner pairs.
    pub workers: usize,
    pub store: StoreConfig,
    pub relay: RelayConfig,
    /// Minimum time between two launches at the same slot.
    pub restart_backoff: Duration,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            runtime_dir: default_runtime_dir(),
            workers: default_workers(),
            store: StoreConfig::default(),
            relay: RelayConfig::default(),
            restart_backoff: DEFAULT_RESTART_BACKOFF,
        }
    }
}

impl TopologyConfig {
    pub fn region_path(&self) -> PathBuf {
        self.runtime_dir.join(REGION_FILE)
    }

    pub fn relay_socket(&self, slot: usize) -> PathBuf {
        relay_socket(&self.runtime_dir, slot)
    }

    pub fn frontend_socket(&self, slot: usize) -> PathBuf {
        frontend_socket(&self.runtime_dir, slot)
    }
}

/// Relay socket (front-end to owner) of `slot`.
pub fn relay_socket(runtime_dir: &Path, slot: usize) -> PathBuf {
    runtime_dir.join(format!("relay-{slot}.sock"))
}

/// Gateway socket (external callers to front-end) of `slot`.
pub fn frontend_socket(runtime_dir: &Path, slot: usize) -> PathBuf {
    runtime_dir.join(format!("frontend-{slot}.sock"))
}

pub fn default_runtime_dir() -> PathBuf {
    std::env::temp_dir().join("slotstore")
}

/// One pair per available CPU.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
