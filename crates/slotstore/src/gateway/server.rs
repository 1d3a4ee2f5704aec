use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use slotstore_frame::{FrameError, FrameReader, FrameWriter, DEFAULT_MAX_PAYLOAD};
use slotstore_transport::{SocketListener, TransportError};
use tracing::{debug, info, warn};

use crate::gateway::error::{GatewayError, Result};
use crate::gateway::handler::Gateway;
use crate::gateway::message::GatewayResponse;
use crate::gateway::service::UserService;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The externally reachable socket of a front-end.
///
/// Each accepted connection gets its own thread, so calls from different
/// callers are in flight at the same time.
pub struct GatewayServer {
    listener: SocketListener,
    max_payload_size: usize,
}

impl GatewayServer {
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let listener = SocketListener::bind(path)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        })
    }

    /// Limit for request and reply frames on accepted connections.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn path(&self) -> &Path {
        self.listener.path()
    }

    /// Accept callers until `running` turns false.
    pub fn serve<S>(&self, gateway: Arc<Gateway<S>>, running: &AtomicBool) -> Result<()>
    where
        S: UserService + 'static,
    {
        info!(path = %self.path().display(), "gateway listening");
        while running.load(Ordering::SeqCst) {
            let Some(stream) = self.listener.try_accept()? else {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            };

            let gateway = Arc::clone(&gateway);
            let max_payload_size = self.max_payload_size;
            thread::Builder::new()
                .name("gateway-conn".to_string())
                .spawn(move || {
                    if let Err(err) = serve_connection(stream, &gateway, max_payload_size) {
                        warn!(error = %err, "gateway connection ended with error");
                    }
                })
                .map_err(TransportError::Io)?;
        }
        debug!(path = %self.path().display(), "gateway stopped");
        Ok(())
    }
}

fn serve_connection<S: UserService>(
    stream: UnixStream,
    gateway: &Gateway<S>,
    max_payload_size: usize,
) -> Result<()> {
    let reader_stream = stream.try_clone().map_err(TransportError::Io)?;
    let mut reader = FrameReader::new(reader_stream);
    let mut writer = FrameWriter::new(stream);
    reader.set_max_payload_size(max_payload_size);
    writer.set_max_payload_size(max_payload_size);

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let response = gateway.handle_bytes(&frame.payload);
        debug!(
            request_id = frame.request_id,
            status = response.status,
            "gateway call answered"
        );
        send_response(&mut writer, frame.request_id, &response)?;
    }
}

/// A response over the frame limit goes out as a 500 for the same call.
fn send_response<W: Write>(
    writer: &mut FrameWriter<W>,
    request_id: u64,
    response: &GatewayResponse,
) -> Result<()> {
    let payload = serde_json::to_vec(response)?;
    match writer.send(request_id, &payload) {
        Err(FrameError::PayloadTooLarge { size, max }) => {
            warn!(request_id, size, max, "gateway response too large");
            let fallback = serde_json::to_vec(&GatewayResponse::internal_error())?;
            writer.send(request_id, &fallback)?;
            Ok(())
        }
        sent => sent.map_err(GatewayError::from),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;
    use slotstore_frame::FrameConfig;

    use super::*;
    use crate::gateway::message::STATUS_INTERNAL_ERROR;

    #[test]
    fn oversized_response_is_answered_with_internal_error() {
        let config = FrameConfig {
            max_payload_size: 80,
            ..FrameConfig::default()
        };
        let mut wire = Vec::new();
        {
            let mut writer = FrameWriter::with_config(&mut wire, config);
            let big = GatewayResponse::ok(json!(["x".repeat(200)]));
            send_response(&mut writer, 4, &big).unwrap();
        }

        let frame = FrameReader::new(Cursor::new(wire)).read_frame().unwrap();
        assert_eq!(frame.request_id, 4);
        let response: GatewayResponse = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(response.status, STATUS_INTERNAL_ERROR);
    }
}
