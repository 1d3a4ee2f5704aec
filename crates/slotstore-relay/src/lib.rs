//! Relay between slotstore front-ends and their store owners.
//!
//! A front-end holds a [`RelayClient`]; its paired [`StoreOwner`] holds the
//! [`SlotStore`](slotstore_core::SlotStore). After a short hello on request
//! id 0, the front-end sends [`RelayRequest`]s and the owner answers each one
//! with a [`RelayResponse`] carrying the same request id.

#![cfg(unix)]

pub mod client;
pub mod config;
pub mod error;
pub mod hello;
pub mod owner;
pub mod protocol;

pub use client::RelayClient;
pub use config::{reply_payload_limit, RelayConfig, REPLY_ENVELOPE_OVERHEAD};
pub use error::{RelayError, Result};
pub use hello::{
    hello_client, hello_server, HelloConfig, HelloRequest, HelloResponse, PROTOCOL_NAME,
    PROTOCOL_VERSION,
};
pub use owner::{execute, StoreOwner};
pub use protocol::{RelayRequest, RelayResponse};
