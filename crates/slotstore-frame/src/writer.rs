use std::io::{ErrorKind, Write};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes whole frames, one `write_all` per frame.
///
/// The payload limit is enforced before anything reaches the stream, so a
/// rejected reply leaves the connection usable for the next one.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    max_payload_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Only the payload limit applies here; socket timeouts are set by
    /// [`FrameWriter::with_config_stream`].
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::new(),
            max_payload_size: config.max_payload_size,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.request_id, &frame.payload)
    }

    /// Send `payload` tagged with `request_id` and flush (blocking).
    pub fn send(&mut self, request_id: u64, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        self.scratch.clear();
        encode_frame(request_id, payload, &mut self.scratch)?;
        self.inner
            .write_all(&self.scratch)
            .and_then(|()| self.inner.flush())
            .map_err(|err| match err.kind() {
                ErrorKind::WriteZero => FrameError::ConnectionClosed,
                _ => FrameError::Io(err),
            })?;

        trace!(request_id, size = payload.len(), "frame sent");
        Ok(())
    }

    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.max_payload_size = max_payload_size;
    }
}

#[cfg(unix)]
impl FrameWriter<UnixStream> {
    /// Writer over a socket with the configured write timeout applied.
    pub fn with_config_stream(inner: UnixStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
