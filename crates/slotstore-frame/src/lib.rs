//! Length-prefixed framing with request correlation for the slotstore relay.
//!
//! Every message is framed with:
//! - A 2-byte magic number ("SR") for stream synchronization
//! - A 4-byte little-endian payload length
//! - An 8-byte little-endian request id
//!
//! The request id is what pairs a reply with the request that caused it.
//! Id 0 is reserved for the connection hello.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, HELLO_ID,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
