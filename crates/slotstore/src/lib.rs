//! Shared-memory user store served by per-process front-ends.
//!
//! One fixed-size region holds every user record in a fixed-width slot. Each
//! front-end process reaches the region only through its paired store owner,
//! relaying requests over a Unix socket.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix sockets and the shared region
//! - [`frame`]: length-prefixed frames with request ids
//! - [`store`]: record codec, slot index and the slot store
//! - [`relay`]: relay messages, store owner and relay client
//! - [`gateway`]: the front-end socket external callers use
//! - [`topology`]: primary, supervisor, front-end and standalone runners

#![cfg(unix)]

/// Re-export transport types.
pub mod transport {
    pub use slotstore_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use slotstore_frame::*;
}

/// Re-export store types.
pub mod store {
    pub use slotstore_core::*;
}

/// Re-export relay types.
pub mod relay {
    pub use slotstore_relay::*;
}

pub mod gateway;
pub mod topology;
