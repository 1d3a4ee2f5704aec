use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use slotstore_frame::{FrameConfig, FrameReader, FrameWriter};
use slotstore_transport::{SocketListener, TransportError};
use tracing::warn;

use crate::gateway::error::Result;
use crate::gateway::message::{GatewayRequest, GatewayResponse};

/// Blocking caller of a front-end gateway socket.
pub struct GatewayClient {
    reader: FrameReader<UnixStream>,
    writer: FrameWriter<UnixStream>,
    next_id: u64,
}

impl GatewayClient {
    pub fn connect(path: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self> {
        let stream = SocketListener::connect(path)?;
        let reader_stream = stream.try_clone().map_err(TransportError::Io)?;
        // Reply size is bounded by the server, which knows the store geometry.
        let config = FrameConfig {
            max_payload_size: u32::MAX as usize,
            read_timeout: timeout,
            write_timeout: timeout,
        };
        Ok(Self {
            reader: FrameReader::with_config_stream(reader_stream, config.clone())?,
            writer: FrameWriter::with_config_stream(stream, config)?,
            next_id: 1,
        })
    }

    pub fn call(&mut self, action: &str, payload: Value) -> Result<GatewayResponse> {
        let request_id = self.next_id;
        self.next_id += 1;

        let request = serde_json::to_vec(&GatewayRequest::new(action, payload))?;
        self.writer.send(request_id, &request)?;

        loop {
            let frame = self.reader.read_frame()?;
            if frame.request_id == request_id {
                return Ok(serde_json::from_slice(&frame.payload)?);
            }
            warn!(
                expected = request_id,
                got = frame.request_id,
                "stale gateway response skipped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;
    use slotstore_core::{SlotStore, StoreConfig};

    use super::*;
    use crate::gateway::handler::Gateway;
    use crate::gateway::message::{STATUS_CREATED, STATUS_NO_CONTENT, STATUS_OK};
    use crate::gateway::server::GatewayServer;
    use crate::gateway::service::LocalService;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/slotstore-gw-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("frontend-0.sock")
    }

    #[test]
    fn client_round_trips_through_server() {
        let sock_path = make_sock_path("rt");
        let store = SlotStore::anonymous(StoreConfig::default()).unwrap();
        let gateway = Arc::new(Gateway::new(LocalService::new(store)).unwrap());
        let server = GatewayServer::bind(&sock_path).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let server_running = Arc::clone(&running);
        let handle = thread::spawn(move || server.serve(gateway, &server_running));

        let mut client = GatewayClient::connect(&sock_path, Some(Duration::from_secs(5))).unwrap();
        let created = client
            .call(
                "create",
                json!({"username": "Ada", "age": 36, "hobbies": ["math"]}),
            )
            .unwrap();
        assert_eq!(created.status, STATUS_CREATED);
        let id = created.body["id"].as_str().unwrap().to_string();

        let fetched = client.call("get", json!({"id": id})).unwrap();
        assert_eq!(fetched.status, STATUS_OK);
        assert_eq!(fetched.body["username"], "Ada");

        // A second caller sees the same store.
        let mut other = GatewayClient::connect(&sock_path, Some(Duration::from_secs(5))).unwrap();
        let deleted = other.call("delete", json!({"id": id})).unwrap();
        assert_eq!(deleted.status, STATUS_NO_CONTENT);

        running.store(false, std::sync::atomic::Ordering::SeqCst);
        handle.join().unwrap().unwrap();
        assert!(!sock_path.exists());
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
