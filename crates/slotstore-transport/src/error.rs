use std::path::PathBuf;

/// Errors raised by the socket and shared region layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified socket path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified socket path.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on a socket stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// Creating, opening, or mapping a shared region failed.
    #[error("failed to map shared region {}: {source}", display_region(.path))]
    Region {
        path: Option<PathBuf>,
        source: std::io::Error,
    },

    /// A shared region must span at least one byte.
    #[error("shared region length must be non-zero")]
    EmptyRegion,
}

fn display_region(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<anonymous>".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
