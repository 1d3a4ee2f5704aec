//! Front-end gateway: the socket external callers use.
//!
//! Stands in for an HTTP layer. A call is a framed
//! `{"action": ..., "payload": ...}` envelope and the answer a
//! `{"status": ..., "body": ...}` pair using HTTP status codes and the same
//! `{"message": ...}` error bodies an HTTP API would return.

pub mod client;
pub mod error;
pub mod handler;
pub mod message;
pub mod server;
pub mod service;
pub mod validate;

pub use client::GatewayClient;
pub use error::{GatewayError, Result};
pub use handler::Gateway;
pub use message::{GatewayRequest, GatewayResponse};
pub use server::GatewayServer;
pub use service::{LocalService, UserService};
pub use validate::{is_valid_user_id, PayloadRejection, PayloadValidator};
