use std::path::PathBuf;

use slotstore_core::StoreError;
use slotstore_relay::RelayError;
use slotstore_transport::TransportError;

use crate::gateway::GatewayError;

/// Errors raised while starting or supervising the process topology.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Runtime directory could not be prepared.
    #[error("runtime directory {path}: {source}")]
    RuntimeDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A front-end process could not be launched or inspected.
    #[error("front-end {slot}: {source}")]
    Frontend {
        slot: usize,
        source: std::io::Error,
    },

    /// Thread spawn failure.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The front-end's relay connection is gone.
    #[error("relay lost: {0}")]
    RelayLost(String),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
