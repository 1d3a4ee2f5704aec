use std::time::Duration;

use slotstore_core::StoreConfig;
use slotstore_frame::DEFAULT_MAX_PAYLOAD;

use crate::hello::HelloConfig;

/// Room for the reply envelope around a full scan.
pub const REPLY_ENVELOPE_OVERHEAD: usize = 64 * 1024;

/// Largest reply a store of this geometry can produce.
///
/// A `getAll` reply carries at most `capacity` records of at most
/// `slot_width - 1` bytes each, plus one separator per record.
pub fn reply_payload_limit(store: &StoreConfig) -> usize {
    store
        .region_len()
        .saturating_add(REPLY_ENVELOPE_OVERHEAD)
}

/// Tunables shared by both ends of a relay connection.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Hello exchange settings.
    pub hello: HelloConfig,
    /// Maximum request/response payload size once the hello completes.
    /// Raised per connection to fit a full scan of the attached store.
    pub max_payload_size: usize,
    /// Per-request deadline on the front-end side. `None` waits until the
    /// owner answers or the connection drops.
    pub request_timeout: Option<Duration>,
}

impl RelayConfig {
    /// Payload limit for a connection to a store of this geometry.
    pub fn payload_limit_for(&self, store: &StoreConfig) -> usize {
        self.max_payload_size.max(reply_payload_limit(store))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            hello: HelloConfig::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            request_timeout: None,
        }
    }
}
