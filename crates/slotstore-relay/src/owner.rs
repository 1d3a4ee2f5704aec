use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use slotstore_core::SlotStore;
use slotstore_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use slotstore_transport::{SocketListener, TransportError};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::hello::hello_server;
use crate::protocol::{RelayRequest, RelayResponse};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The single actor that touches the store on behalf of one front-end.
///
/// Accepts one relay connection at a time and executes its requests strictly
/// in arrival order. When the front-end goes away the owner goes back to
/// accepting, keeping its store mapping.
pub struct StoreOwner {
    id: usize,
    listener: SocketListener,
    store: SlotStore,
    config: RelayConfig,
}

impl StoreOwner {
    /// Bind the relay socket for topology slot `id`.
    pub fn bind(
        id: usize,
        path: impl AsRef<Path>,
        store: SlotStore,
        config: RelayConfig,
    ) -> Result<Self> {
        let listener = SocketListener::bind(path)?;
        info!(owner = id, path = %listener.path().display(), "store owner listening");
        Ok(Self {
            id,
            listener,
            store,
            config,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.listener.path()
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Serve front-ends until `running` turns false or accepting fails.
    ///
    /// A failing connection is logged and dropped; only listener errors end
    /// the loop early. `running` is checked between connections, so a
    /// connected front-end is served until it detaches.
    pub fn serve_until(&mut self, running: &AtomicBool) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        while running.load(Ordering::SeqCst) {
            let Some(stream) = self.listener.try_accept()? else {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            };
            if let Err(err) = self.serve_connection(stream) {
                warn!(owner = self.id, error = %err, "relay connection ended with error");
            }
        }
        info!(owner = self.id, "store owner stopped");
        Ok(())
    }

    /// Accept a single front-end and serve it until it disconnects.
    pub fn accept_one(&mut self) -> Result<()> {
        let stream = self.listener.accept()?;
        if let Err(err) = self.serve_connection(stream) {
            warn!(owner = self.id, error = %err, "relay connection ended with error");
        }
        Ok(())
    }

    /// Run the hello and then the request loop on an accepted stream.
    pub fn serve_connection(&mut self, stream: UnixStream) -> Result<()> {
        let reader_stream = stream.try_clone().map_err(TransportError::Io)?;

        let frame_config = FrameConfig {
            max_payload_size: self.config.hello.max_handshake_payload,
            read_timeout: Some(self.config.hello.timeout),
            write_timeout: Some(self.config.hello.timeout),
        };
        let mut reader = FrameReader::with_config_stream(reader_stream, frame_config.clone())?;
        let mut writer = FrameWriter::with_config_stream(stream, frame_config)?;

        let hello = hello_server(
            &mut reader,
            &mut writer,
            self.id,
            self.store.config(),
            &self.config.hello,
        )?;
        info!(owner = self.id, worker = hello.worker, "front-end attached");

        // Requests may arrive at any pace once attached.
        reader.set_read_timeout(None)?;
        let limit = self.config.payload_limit_for(&self.store.config());
        reader.set_max_payload_size(limit);
        writer.set_max_payload_size(limit);

        loop {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::ConnectionClosed) => {
                    info!(owner = self.id, worker = hello.worker, "front-end detached");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let response = match serde_json::from_slice::<RelayRequest>(&frame.payload) {
                Ok(request) => {
                    debug!(
                        owner = self.id,
                        request_id = frame.request_id,
                        action = request.action(),
                        "request received"
                    );
                    execute(&mut self.store, request)
                }
                Err(err) => {
                    warn!(
                        owner = self.id,
                        request_id = frame.request_id,
                        error = %err,
                        "malformed relay request"
                    );
                    RelayResponse::error(format!("malformed request: {err}"))
                }
            };

            send_reply(&mut writer, frame.request_id, &response)?;
        }
    }
}

/// Send `response` for `request_id`.
///
/// A reply over the payload limit is replaced by an [`RelayResponse::Error`]
/// for the same id so the connection stays usable.
pub fn send_reply<W: Write>(
    writer: &mut FrameWriter<W>,
    request_id: u64,
    response: &RelayResponse,
) -> Result<()> {
    let payload = serde_json::to_vec(response)?;
    match writer.send(request_id, &payload) {
        Err(FrameError::PayloadTooLarge { size, max }) => {
            warn!(
                request_id,
                action = response.action(),
                size,
                max,
                "relay reply too large"
            );
            let fallback = RelayResponse::error(format!(
                "{} reply of {size} bytes exceeds the {max} byte limit",
                response.action()
            ));
            writer.send(request_id, &serde_json::to_vec(&fallback)?)?;
            Ok(())
        }
        sent => sent.map_err(RelayError::from),
    }
}

/// Apply one request to the store.
///
/// Store failures come back as [`RelayResponse::Error`]; absence and
/// "nothing deleted" are ordinary results.
pub fn execute(store: &mut SlotStore, request: RelayRequest) -> RelayResponse {
    let outcome = match request {
        RelayRequest::GetAll => Ok(RelayResponse::GetAll(store.get_all())),
        RelayRequest::Get { id } => Ok(RelayResponse::Get(store.get(&id))),
        RelayRequest::Create(fields) => store.create(fields).map(RelayResponse::Create),
        RelayRequest::Update { id, data } => store.update(&id, data).map(RelayResponse::Update),
        RelayRequest::Delete { id } => Ok(RelayResponse::Delete(store.delete(&id))),
    };

    outcome.unwrap_or_else(|err| {
        warn!(error = %err, "store operation failed");
        RelayResponse::error(err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use slotstore_core::{NewUser, StoreConfig, User, UserPatch};

    use super::*;

    fn store() -> SlotStore {
        SlotStore::anonymous(StoreConfig::default()).unwrap()
    }

    fn jane() -> NewUser {
        NewUser {
            username: "Jane".to_string(),
            age: 41,
            hobbies: vec!["chess".to_string()],
        }
    }

    #[test]
    fn execute_covers_every_action() {
        let mut store = store();

        let RelayResponse::Create(created) = execute(&mut store, RelayRequest::Create(jane()))
        else {
            panic!("create should return the stored user");
        };

        assert_eq!(
            execute(
                &mut store,
                RelayRequest::Get {
                    id: created.id.clone()
                }
            ),
            RelayResponse::Get(Some(created.clone()))
        );

        let RelayResponse::Update(Some(updated)) = execute(
            &mut store,
            RelayRequest::Update {
                id: created.id.clone(),
                data: UserPatch {
                    username: Some("Janet".to_string()),
                    ..UserPatch::default()
                },
            },
        ) else {
            panic!("update should return the merged user");
        };
        assert_eq!(updated.username, "Janet");
        assert_eq!(updated.age, 41);

        assert_eq!(
            execute(&mut store, RelayRequest::GetAll),
            RelayResponse::GetAll(vec![updated])
        );
        assert_eq!(
            execute(
                &mut store,
                RelayRequest::Delete {
                    id: created.id.clone()
                }
            ),
            RelayResponse::Delete(true)
        );
        assert_eq!(
            execute(&mut store, RelayRequest::Delete { id: created.id }),
            RelayResponse::Delete(false)
        );
    }

    #[test]
    fn execute_reports_missing_records_as_results() {
        let mut store = store();
        assert_eq!(
            execute(
                &mut store,
                RelayRequest::Get {
                    id: "nobody".to_string()
                }
            ),
            RelayResponse::Get(None)
        );
        assert_eq!(
            execute(
                &mut store,
                RelayRequest::Update {
                    id: "nobody".to_string(),
                    data: UserPatch::default(),
                }
            ),
            RelayResponse::Update(None)
        );
    }

    #[test]
    fn oversized_reply_becomes_error_for_same_request() {
        let config = FrameConfig {
            max_payload_size: 128,
            ..FrameConfig::default()
        };
        let mut wire = Vec::new();
        {
            let mut writer = FrameWriter::with_config(&mut wire, config);
            let big = RelayResponse::GetAll(vec![
                User::from_new("1", jane()),
                User::from_new("2", jane()),
                User::from_new("3", jane()),
            ]);
            send_reply(&mut writer, 7, &big).unwrap();
            send_reply(&mut writer, 8, &RelayResponse::Delete(true)).unwrap();
        }

        let mut reader = FrameReader::new(std::io::Cursor::new(wire));
        let first = reader.read_frame().unwrap();
        assert_eq!(first.request_id, 7);
        let RelayResponse::Error { message } = serde_json::from_slice(&first.payload).unwrap()
        else {
            panic!("oversized reply should be replaced by an error");
        };
        assert!(message.starts_with("getAll reply of"));

        let second = reader.read_frame().unwrap();
        assert_eq!(second.request_id, 8);
        assert_eq!(
            serde_json::from_slice::<RelayResponse>(&second.payload).unwrap(),
            RelayResponse::Delete(true)
        );
    }

    #[test]
    fn serve_until_stops_between_connections() {
        let dir = std::path::PathBuf::from(format!(
            "/tmp/slotstore-owner-stop-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("relay-0.sock");

        let mut owner = StoreOwner::bind(0, &sock_path, store(), RelayConfig::default()).unwrap();
        let running = std::sync::Arc::new(AtomicBool::new(true));
        let flag = std::sync::Arc::clone(&running);
        let server = thread::spawn(move || {
            owner.serve_until(&flag).unwrap();
            owner
        });

        let client = crate::RelayClient::connect(&sock_path, 0, &RelayConfig::default()).unwrap();
        let created = client.create(jane()).unwrap();
        drop(client);

        running.store(false, Ordering::SeqCst);
        let owner = server.join().unwrap();
        assert_eq!(owner.store().get(&created.id), Some(created));

        drop(owner);
        assert!(!sock_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
