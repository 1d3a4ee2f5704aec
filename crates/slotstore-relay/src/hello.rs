use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotstore_core::StoreConfig;
use slotstore_frame::{FrameError, FrameReader, FrameWriter, HELLO_ID};

use crate::error::{RelayError, Result};

const MAX_PROTOCOL_LEN: usize = 32;
const MAX_VERSION_LEN: usize = 16;

/// Protocol name exchanged in the hello.
pub const PROTOCOL_NAME: &str = "slotstore";

/// Relay protocol version spoken by this build.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Sent by the front-end right after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloRequest {
    pub protocol: String,
    pub version: String,
    /// Topology slot of the connecting front-end.
    pub worker: usize,
}

/// The owner's reply, describing the store it serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloResponse {
    pub protocol: String,
    pub version: String,
    /// Topology slot of the owner.
    pub owner: usize,
    pub capacity: usize,
    pub slot_width: usize,
}

/// Configuration for the hello exchange.
#[derive(Debug, Clone)]
pub struct HelloConfig {
    /// Timeout for each blocking hello operation.
    pub timeout: Duration,
    /// Expected protocol name.
    pub protocol_name: String,
    /// Local protocol version.
    pub protocol_version: String,
    /// Maximum hello frame payload size in bytes.
    pub max_handshake_payload: usize,
}

impl Default for HelloConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            protocol_name: PROTOCOL_NAME.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_handshake_payload: 16 * 1024,
        }
    }
}

/// Front-end side of the hello.
pub fn hello_client<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    worker: usize,
    config: &HelloConfig,
) -> Result<HelloResponse> {
    validate_protocol_name(&config.protocol_name)?;
    validate_version(&config.protocol_version)?;

    let req = HelloRequest {
        protocol: config.protocol_name.clone(),
        version: config.protocol_version.clone(),
        worker,
    };
    send_hello_json(writer, &req)?;

    let payload = recv_hello_payload(reader, config)?;
    let resp: HelloResponse = serde_json::from_slice(&payload)?;

    validate_protocol_name(&resp.protocol)?;
    validate_version(&resp.version)?;

    if resp.protocol != config.protocol_name {
        return Err(RelayError::HandshakeFailed(format!(
            "unknown protocol '{}' (expected '{}')",
            resp.protocol, config.protocol_name
        )));
    }

    if !is_version_compatible(&config.protocol_version, &resp.version)? {
        return Err(RelayError::HandshakeFailed(format!(
            "incompatible version '{}' (local '{}')",
            resp.version, config.protocol_version
        )));
    }

    Ok(resp)
}

/// Owner side of the hello. Returns the front-end's request on success.
pub fn hello_server<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    owner: usize,
    store: StoreConfig,
    config: &HelloConfig,
) -> Result<HelloRequest> {
    validate_protocol_name(&config.protocol_name)?;
    validate_version(&config.protocol_version)?;

    let payload = recv_hello_payload(reader, config)?;
    let req: HelloRequest = serde_json::from_slice(&payload)?;

    validate_protocol_name(&req.protocol)?;
    validate_version(&req.version)?;

    if req.protocol != config.protocol_name {
        return Err(RelayError::HandshakeFailed(format!(
            "unknown protocol '{}' (expected '{}')",
            req.protocol, config.protocol_name
        )));
    }

    if !is_version_compatible(&req.version, &config.protocol_version)? {
        return Err(RelayError::HandshakeFailed(format!(
            "incompatible version '{}' (owner '{}')",
            req.version, config.protocol_version
        )));
    }

    let resp = HelloResponse {
        protocol: config.protocol_name.clone(),
        version: config.protocol_version.clone(),
        owner,
        capacity: store.capacity,
        slot_width: store.slot_width,
    };
    send_hello_json(writer, &resp)?;

    Ok(req)
}

fn send_hello_json<T: Serialize, W: Write>(writer: &mut FrameWriter<W>, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    writer.send(HELLO_ID, &payload)?;
    Ok(())
}

fn recv_hello_payload<R: Read>(
    reader: &mut FrameReader<R>,
    config: &HelloConfig,
) -> Result<Vec<u8>> {
    match reader.read_frame() {
        Ok(frame) => {
            if frame.request_id != HELLO_ID {
                return Err(RelayError::HandshakeFailed(format!(
                    "expected hello on request id {}, got {}",
                    HELLO_ID, frame.request_id
                )));
            }
            if frame.payload.len() > config.max_handshake_payload {
                return Err(RelayError::HandshakeFailed(format!(
                    "hello payload too large: {} (max {})",
                    frame.payload.len(),
                    config.max_handshake_payload
                )));
            }
            Ok(frame.payload.to_vec())
        }
        Err(err) if err.is_timeout() => Err(RelayError::Timeout(config.timeout)),
        Err(FrameError::ConnectionClosed) => Err(RelayError::Disconnected(
            "connection closed during hello".to_string(),
        )),
        Err(err) => Err(RelayError::Frame(err)),
    }
}

fn validate_protocol_name(protocol: &str) -> Result<()> {
    if protocol.is_empty() || protocol.len() > MAX_PROTOCOL_LEN {
        return Err(RelayError::HandshakeFailed(format!(
            "invalid protocol name length: {}",
            protocol.len()
        )));
    }
    Ok(())
}

fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() || version.len() > MAX_VERSION_LEN {
        return Err(RelayError::HandshakeFailed(format!(
            "invalid protocol version length: {}",
            version.len()
        )));
    }
    let _ = parse_version(version)?;
    Ok(())
}

fn is_version_compatible(client_version: &str, owner_version: &str) -> Result<bool> {
    let (client_major, client_minor) = parse_version(client_version)?;
    let (owner_major, owner_minor) = parse_version(owner_version)?;

    Ok(client_major == owner_major && client_minor >= owner_minor)
}

fn parse_version(version: &str) -> Result<(u16, u16)> {
    let invalid = |why: &str| RelayError::HandshakeFailed(format!("invalid version '{version}': {why}"));

    let (major, minor) = version
        .split_once('.')
        .ok_or_else(|| invalid("expected '<major>.<minor>'"))?;
    if minor.contains('.') {
        return Err(invalid("expected '<major>.<minor>'"));
    }

    let major = major.parse::<u16>().map_err(|_| invalid("non-numeric major"))?;
    let minor = minor.parse::<u16>().map_err(|_| invalid("non-numeric minor"))?;

    Ok((major, minor))
}
