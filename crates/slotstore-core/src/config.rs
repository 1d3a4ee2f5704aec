use crate::error::{Result, StoreError};

/// Default number of slots.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default slot width in bytes, terminator included.
pub const DEFAULT_SLOT_WIDTH: usize = 256;

/// Store geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of slots (`C`).
    pub capacity: usize,
    /// Width of one slot in bytes (`W`). A record may use at most `W - 1`.
    pub slot_width: usize,
}

impl StoreConfig {
    /// Bytes the shared region must span.
    pub fn region_len(&self) -> usize {
        self.capacity.saturating_mul(self.slot_width)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(StoreError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.slot_width < 2 {
            return Err(StoreError::InvalidConfig(format!(
                "slot width {} leaves no room for a record and its terminator",
                self.slot_width
            )));
        }
        if self.capacity.checked_mul(self.slot_width).is_none() {
            return Err(StoreError::InvalidConfig(format!(
                "{} slots of {} bytes overflow the address space",
                self.capacity, self.slot_width
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            slot_width: DEFAULT_SLOT_WIDTH,
        }
    }
}
