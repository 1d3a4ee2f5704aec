use slotstore_transport::SharedRegion;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::{decode_slot, encode_slot_into};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::index::slot_index;
use crate::record::{NewUser, User, UserPatch};

/// Fixed-capacity user store laid out over a shared region.
///
/// Slot `i` occupies bytes `[i * W, (i + 1) * W)` of the region. A slot is
/// empty when all of its bytes are zero. Mutating operations take `&mut self`:
/// a store value is meant to be driven by a single owner. Other mappings of
/// the same region (other owners) are not coordinated with.
#[derive(Debug)]
pub struct SlotStore {
    region: SharedRegion,
    config: StoreConfig,
}

impl SlotStore {
    /// Wrap an existing mapping. The region must be exactly
    /// `capacity * slot_width` bytes.
    pub fn new(region: SharedRegion, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        if region.len() != config.region_len() {
            return Err(StoreError::RegionSizeMismatch {
                expected: config.region_len(),
                actual: region.len(),
            });
        }
        Ok(Self { region, config })
    }

    /// Store over a private anonymous region.
    pub fn anonymous(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let region = SharedRegion::anonymous(config.region_len())?;
        Self::new(region, config)
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    pub fn region(&self) -> &SharedRegion {
        &self.region
    }

    /// Slot that `id` maps to.
    pub fn slot_of(&self, id: &str) -> usize {
        slot_index(id, self.config.capacity)
    }

    /// Encode `user` and overwrite its slot unconditionally.
    ///
    /// Whatever occupied the slot before (another id that hashes to the same
    /// index included) is replaced. A record whose JSON does not fit in
    /// `W - 1` bytes is stored truncated; this is logged but not reported.
    pub fn put(&mut self, user: &User) -> Result<()> {
        let index = self.slot_of(&user.id);
        let width = self.config.slot_width;

        let mut slot = vec![0u8; width];
        let encoded_len = encode_slot_into(user, &mut slot)?;
        if encoded_len >= width {
            warn!(
                id = %user.id,
                slot = index,
                encoded_len,
                slot_width = width,
                "record exceeds slot width; stored truncated"
            );
        }

        self.region.write(index * width, &slot);
        debug!(id = %user.id, slot = index, "slot written");
        Ok(())
    }

    /// Record stored under `id`, if the slot for `id` holds that record.
    ///
    /// A slot occupied by a different id (collision eviction) reads as absent.
    pub fn get(&self, id: &str) -> Option<User> {
        self.read_slot(self.slot_of(id))
            .filter(|user| user.id == id)
    }

    /// Zero the slot for `id` if it currently holds that record.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let index = self.slot_of(id);
        let width = self.config.slot_width;
        self.region.fill(index * width, width, 0);
        debug!(id, slot = index, "slot cleared");
        true
    }

    /// Assign a fresh id to `fields` and store the record.
    pub fn create(&mut self, fields: NewUser) -> Result<User> {
        let user = User::from_new(Uuid::new_v4().to_string(), fields);
        self.put(&user)?;
        Ok(user)
    }

    /// Merge `patch` over the record stored under `id`.
    ///
    /// Returns `Ok(None)` when no such record is present.
    pub fn update(&mut self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        let Some(mut user) = self.get(id) else {
            return Ok(None);
        };
        user.apply(patch);
        self.put(&user)?;
        Ok(Some(user))
    }

    /// Decode every slot, in slot order.
    ///
    /// Always visits all `capacity` slots; empty and undecodable slots are
    /// skipped.
    pub fn get_all(&self) -> Vec<User> {
        (0..self.config.capacity)
            .filter_map(|index| self.read_slot(index))
            .collect()
    }

    fn read_slot(&self, index: usize) -> Option<User> {
        let width = self.config.slot_width;
        let offset = index * width;
        if self.region.is_zeroed(offset, width) {
            return None;
        }
        let mut slot = vec![0u8; width];
        self.region.read(offset, &mut slot);
        decode_slot(&slot)
    }
}
