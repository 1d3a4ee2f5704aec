/// Errors that can occur on either end of a relay connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] slotstore_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] slotstore_frame::FrameError),

    /// Store error raised while executing a request.
    #[error("store error: {0}")]
    Store(#[from] slotstore_core::StoreError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hello exchange failed.
    #[error("hello failed: {0}")]
    HandshakeFailed(String),

    /// The other end went away.
    #[error("relay disconnected: {0}")]
    Disconnected(String),

    /// The owner answered with a result for a different action.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    /// The owner reported a failure for this request.
    #[error("owner error: {0}")]
    Owner(String),

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, RelayError>;
