use slotstore_core::StoreError;
use slotstore_frame::FrameError;
use slotstore_relay::RelayError;
use slotstore_transport::TransportError;

/// Errors raised while serving or calling a gateway socket.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Relay to the store owner failed.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    /// Direct store access failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A payload schema failed to compile.
    #[error("failed to compile schema: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
