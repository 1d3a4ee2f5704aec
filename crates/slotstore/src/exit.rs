use std::fmt;
use std::io;

use slotstore::frame::FrameError;
use slotstore::gateway::message::{
    STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR, STATUS_METHOD_NOT_ALLOWED, STATUS_NOT_FOUND,
};
use slotstore::gateway::{GatewayError, GatewayResponse};
use slotstore::relay::RelayError;
use slotstore::store::StoreError;
use slotstore::topology::TopologyError;
use slotstore::transport::TransportError;

// Exit codes follow sysexits-style conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match err {
        StoreError::Region(err) => transport_error(context, err),
        StoreError::InvalidConfig(_) | StoreError::RegionSizeMismatch { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Transport(err) => transport_error(context, err),
        RelayError::Frame(err) => frame_error(context, err),
        RelayError::Store(err) => store_error(context, err),
        RelayError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        RelayError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        RelayError::Disconnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn gateway_error(context: &str, err: GatewayError) -> CliError {
    match err {
        GatewayError::Transport(err) => transport_error(context, err),
        GatewayError::Frame(err) => frame_error(context, err),
        GatewayError::Relay(err) => relay_error(context, err),
        GatewayError::Store(err) => store_error(context, err),
        GatewayError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn topology_error(context: &str, err: TopologyError) -> CliError {
    match err {
        TopologyError::RuntimeDir { source, .. } | TopologyError::Frontend { source, .. } => {
            io_error(context, source)
        }
        TopologyError::Transport(err) => transport_error(context, err),
        TopologyError::Store(err) => store_error(context, err),
        TopologyError::Relay(err) => relay_error(context, err),
        TopologyError::Gateway(err) => gateway_error(context, err),
        TopologyError::RelayLost(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

/// Exit code for a non-success gateway answer.
pub fn status_error(response: &GatewayResponse) -> CliError {
    let code = match response.status {
        STATUS_BAD_REQUEST => DATA_INVALID,
        STATUS_NOT_FOUND => FAILURE,
        STATUS_METHOD_NOT_ALLOWED => USAGE,
        STATUS_INTERNAL_ERROR => INTERNAL,
        _ => FAILURE,
    };
    let message = response.error_message().unwrap_or("request failed");
    CliError::new(code, format!("{} {message}", response.status))
}
