//! Local transport primitives for slotstore.
//!
//! Two things live here:
//! - [`SocketListener`]: Unix domain socket bind/accept/connect used by the
//!   relay (front-end ↔ store owner) and by the front-end gateway.
//! - [`SharedRegion`]: one contiguous block of memory mapped `MAP_SHARED`,
//!   either backed by a file (so several mappings see the same bytes) or
//!   anonymous.
//!
//! Everything above this crate talks to sockets and memory only through
//! these two types.

#![cfg(unix)]

pub mod error;
pub mod region;
pub mod uds;

pub use error::{Result, TransportError};
pub use region::SharedRegion;
pub use uds::SocketListener;
