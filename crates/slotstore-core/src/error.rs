use slotstore_transport::TransportError;

/// Errors raised while setting up or writing to a slot store.
///
/// Lookups never fail: a missing, evicted, or undecodable record is reported
/// as `None`/`false` by the store operations themselves.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The shared region could not be created or mapped.
    #[error("region error: {0}")]
    Region(#[from] TransportError),

    /// The store geometry is unusable.
    #[error("invalid store config: {0}")]
    InvalidConfig(String),

    /// The region does not match `capacity * slot_width`.
    #[error("region is {actual} bytes, store layout needs {expected}")]
    RegionSizeMismatch { expected: usize, actual: usize },

    /// A record could not be serialized.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
