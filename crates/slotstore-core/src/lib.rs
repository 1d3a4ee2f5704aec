//! Fixed-capacity, fixed-width user record store.
//!
//! A [`SlotStore`] divides one [`SharedRegion`](slotstore_transport::SharedRegion)
//! into `capacity` slots of `slot_width` bytes. Each record lives in the slot
//! chosen by [`slot_index`] from its id alone; there is no probing, so two ids
//! that land on the same slot evict each other (last write wins).
//!
//! Records are stored as zero-terminated JSON, see [`codec`].

pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod record;
pub mod store;

pub use codec::{decode_slot, encode_slot, encode_slot_into};
pub use config::{StoreConfig, DEFAULT_CAPACITY, DEFAULT_SLOT_WIDTH};
pub use error::{Result, StoreError};
pub use index::slot_index;
pub use record::{NewUser, User, UserPatch};
pub use store::SlotStore;
