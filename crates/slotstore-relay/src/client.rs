use std::collections::HashMap;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use slotstore_core::{NewUser, StoreConfig, User, UserPatch};
use slotstore_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use slotstore_transport::{SocketListener, TransportError};
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::hello::{hello_client, HelloResponse};
use crate::protocol::{RelayRequest, RelayResponse};

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

type Waiter = Sender<Result<RelayResponse>>;

#[derive(Default)]
struct Pending {
    waiters: HashMap<u64, Waiter>,
    closed: Option<String>,
}

struct Shared {
    pending: Mutex<Pending>,
    closed_signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Front-end end of a relay connection.
///
/// Any number of threads may issue requests at once. Each request gets a
/// fresh id; a background reader thread hands every reply to the waiter
/// registered under the id it carries. When the connection drops, every
/// outstanding and future request fails with [`RelayError::Disconnected`].
pub struct RelayClient {
    shared: Arc<Shared>,
    writer: Mutex<FrameWriter<UnixStream>>,
    stream: UnixStream,
    next_id: AtomicU64,
    hello: HelloResponse,
    request_timeout: Option<Duration>,
    reader: Option<JoinHandle<()>>,
}

impl RelayClient {
    /// Connect to the owner's relay socket and run the hello as `worker`.
    pub fn connect(path: impl AsRef<Path>, worker: usize, config: &RelayConfig) -> Result<Self> {
        let stream = SocketListener::connect(path)?;
        Self::from_stream(stream, worker, config)
    }

    /// Like [`RelayClient::connect`], retrying while the socket is not yet
    /// accepting connections.
    pub fn connect_with_retry(
        path: impl AsRef<Path>,
        worker: usize,
        config: &RelayConfig,
        retry_for: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        let deadline = Instant::now() + retry_for;
        loop {
            match Self::connect(path, worker, config) {
                Err(RelayError::Transport(TransportError::Connect { source, .. }))
                    if Instant::now() < deadline =>
                {
                    debug!(path = %path.display(), error = %source, "relay not ready, retrying");
                    thread::sleep(CONNECT_RETRY_INTERVAL);
                }
                other => return other,
            }
        }
    }

    /// Run the hello over an already connected stream and start the reader.
    pub fn from_stream(stream: UnixStream, worker: usize, config: &RelayConfig) -> Result<Self> {
        let reader_stream = stream.try_clone().map_err(TransportError::Io)?;
        let writer_stream = stream.try_clone().map_err(TransportError::Io)?;

        let frame_config = FrameConfig {
            max_payload_size: config.hello.max_handshake_payload,
            read_timeout: Some(config.hello.timeout),
            write_timeout: Some(config.hello.timeout),
        };
        let mut reader = FrameReader::with_config_stream(reader_stream, frame_config.clone())?;
        let mut writer = FrameWriter::with_config_stream(writer_stream, frame_config)?;

        let hello = hello_client(&mut reader, &mut writer, worker, &config.hello)?;
        debug!(
            worker,
            owner = hello.owner,
            capacity = hello.capacity,
            slot_width = hello.slot_width,
            "relay attached"
        );

        // The reader blocks until a reply or EOF; there is no idle limit.
        reader.set_read_timeout(None)?;
        let limit = config.payload_limit_for(&StoreConfig {
            capacity: hello.capacity,
            slot_width: hello.slot_width,
        });
        reader.set_max_payload_size(limit);
        writer.set_max_payload_size(limit);

        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            closed_signal: Condvar::new(),
        });
        let reader_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("relay-reader-{worker}"))
            .spawn(move || read_responses(reader, &reader_shared))
            .map_err(TransportError::Io)?;

        Ok(Self {
            shared,
            writer: Mutex::new(writer),
            stream,
            next_id: AtomicU64::new(1),
            hello,
            request_timeout: config.request_timeout,
            reader: Some(handle),
        })
    }

    /// What the owner reported during the hello.
    pub fn hello(&self) -> &HelloResponse {
        &self.hello
    }

    /// Send `request` and block until its reply arrives.
    ///
    /// An [`RelayResponse::Error`] reply is turned into [`RelayError::Owner`].
    pub fn request(&self, request: RelayRequest) -> Result<RelayResponse> {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::to_vec(&request)?;

        let (tx, rx) = mpsc::channel();
        {
            let mut pending = self.shared.lock();
            if let Some(reason) = &pending.closed {
                return Err(RelayError::Disconnected(reason.clone()));
            }
            pending.waiters.insert(request_id, tx);
        }

        debug!(request_id, action = request.action(), "relay request");
        let sent = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .send(request_id, &payload);
        if let Err(err) = sent {
            self.shared.lock().waiters.remove(&request_id);
            return Err(err.into());
        }

        let reply = match self.request_timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => {
                    self.shared.lock().waiters.remove(&request_id);
                    return Err(RelayError::Timeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
            },
            None => rx.recv().unwrap_or_else(|_| Err(self.disconnected())),
        };

        match reply? {
            RelayResponse::Error { message } => Err(RelayError::Owner(message)),
            response => Ok(response),
        }
    }

    pub fn get_all(&self) -> Result<Vec<User>> {
        match self.request(RelayRequest::GetAll)? {
            RelayResponse::GetAll(users) => Ok(users),
            other => Err(unexpected("getAll", &other)),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<User>> {
        match self.request(RelayRequest::Get { id: id.to_string() })? {
            RelayResponse::Get(user) => Ok(user),
            other => Err(unexpected("get", &other)),
        }
    }

    pub fn create(&self, fields: NewUser) -> Result<User> {
        match self.request(RelayRequest::Create(fields))? {
            RelayResponse::Create(user) => Ok(user),
            other => Err(unexpected("create", &other)),
        }
    }

    pub fn update(&self, id: &str, data: UserPatch) -> Result<Option<User>> {
        match self.request(RelayRequest::Update {
            id: id.to_string(),
            data,
        })? {
            RelayResponse::Update(user) => Ok(user),
            other => Err(unexpected("update", &other)),
        }
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        match self.request(RelayRequest::Delete { id: id.to_string() })? {
            RelayResponse::Delete(removed) => Ok(removed),
            other => Err(unexpected("delete", &other)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed.is_some()
    }

    /// Block until the connection is gone and return the reason.
    pub fn wait_disconnected(&self) -> String {
        let mut pending = self.shared.lock();
        loop {
            if let Some(reason) = &pending.closed {
                return reason.clone();
            }
            pending = self
                .shared
                .closed_signal
                .wait(pending)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    fn disconnected(&self) -> RelayError {
        let reason = self
            .shared
            .lock()
            .closed
            .clone()
            .unwrap_or_else(|| "reply channel dropped".to_string());
        RelayError::Disconnected(reason)
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

fn read_responses(mut reader: FrameReader<UnixStream>, shared: &Shared) {
    let reason = loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break "owner closed the connection".to_string(),
            Err(err) => break err.to_string(),
        };

        let Some(waiter) = shared.lock().waiters.remove(&frame.request_id) else {
            warn!(request_id = frame.request_id, "reply for unknown request id dropped");
            continue;
        };

        let reply = serde_json::from_slice::<RelayResponse>(&frame.payload).map_err(RelayError::from);
        // The waiter may have timed out and gone.
        let _ = waiter.send(reply);
    };

    debug!(reason = %reason, "relay reader stopped");
    let mut pending = shared.lock();
    pending.closed = Some(reason.clone());
    for (_, waiter) in pending.waiters.drain() {
        let _ = waiter.send(Err(RelayError::Disconnected(reason.clone())));
    }
    shared.closed_signal.notify_all();
}

fn unexpected(expected: &'static str, actual: &RelayResponse) -> RelayError {
    RelayError::UnexpectedResponse {
        expected,
        actual: actual.action(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Barrier;

    use slotstore_core::SlotStore;
    use slotstore_frame::{DEFAULT_MAX_PAYLOAD, HELLO_ID};

    use super::*;
    use crate::hello::{hello_server, HelloConfig};
    use crate::owner::StoreOwner;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/slotstore-relay-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("relay.sock")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    fn jane() -> NewUser {
        NewUser {
            username: "Jane".to_string(),
            age: 41,
            hobbies: vec!["chess".to_string()],
        }
    }

    /// Owner stand-in: completes the hello, reads `count` requests and
    /// answers them in reverse order of arrival.
    fn reversing_owner(stream: UnixStream, count: usize) {
        let mut reader = FrameReader::new(stream.try_clone().unwrap());
        let mut writer = FrameWriter::new(stream);
        hello_server(
            &mut reader,
            &mut writer,
            0,
            StoreConfig::default(),
            &HelloConfig::default(),
        )
        .unwrap();

        let mut received = Vec::new();
        for _ in 0..count {
            let frame = reader.read_frame().unwrap();
            let request: RelayRequest = serde_json::from_slice(&frame.payload).unwrap();
            received.push((frame.request_id, request));
        }
        for (request_id, request) in received.into_iter().rev() {
            let RelayRequest::Get { id } = request else {
                panic!("only get requests expected");
            };
            let user = User::from_new(id, jane());
            let payload = serde_json::to_vec(&RelayResponse::Get(Some(user))).unwrap();
            writer.send(request_id, &payload).unwrap();
        }
    }

    #[test]
    fn concurrent_requests_get_their_own_replies() {
        const CALLERS: usize = 8;
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || reversing_owner(left, CALLERS));

        let client = Arc::new(RelayClient::from_stream(right, 0, &RelayConfig::default()).unwrap());
        let barrier = Arc::new(Barrier::new(CALLERS));
        let callers: Vec<_> = (0..CALLERS)
            .map(|i| {
                let client = Arc::clone(&client);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let id = format!("user-{i}");
                    let found = client.get(&id).unwrap().unwrap();
                    assert_eq!(found.id, id);
                })
            })
            .collect();

        for caller in callers {
            caller.join().unwrap();
        }
        owner.join().unwrap();
    }

    #[test]
    fn disconnect_fails_in_flight_requests() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            hello_server(
                &mut reader,
                &mut writer,
                0,
                StoreConfig::default(),
                &HelloConfig::default(),
            )
            .unwrap();
            // Take the request, never answer it.
            let _ = reader.read_frame().unwrap();
        });

        let client = RelayClient::from_stream(right, 0, &RelayConfig::default()).unwrap();
        let err = client.get_all().unwrap_err();
        owner.join().unwrap();

        assert!(matches!(err, RelayError::Disconnected(_)));
        assert!(client.is_closed());
        assert!(!client.wait_disconnected().is_empty());
        assert!(matches!(
            client.get("x").unwrap_err(),
            RelayError::Disconnected(_)
        ));
    }

    #[test]
    fn unknown_reply_ids_are_dropped() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            hello_server(
                &mut reader,
                &mut writer,
                0,
                StoreConfig::default(),
                &HelloConfig::default(),
            )
            .unwrap();
            let frame = reader.read_frame().unwrap();
            let stray = serde_json::to_vec(&RelayResponse::Delete(true)).unwrap();
            writer.send(frame.request_id + 1000, &stray).unwrap();
            let real = serde_json::to_vec(&RelayResponse::Delete(false)).unwrap();
            writer.send(frame.request_id, &real).unwrap();
            // Hold the connection until the client has its answer.
            let _ = reader.read_frame();
        });

        let client = RelayClient::from_stream(right, 0, &RelayConfig::default()).unwrap();
        assert!(!client.delete("x").unwrap());
        drop(client);
        owner.join().unwrap();
    }

    #[test]
    fn request_timeout_is_opt_in() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            hello_server(
                &mut reader,
                &mut writer,
                0,
                StoreConfig::default(),
                &HelloConfig::default(),
            )
            .unwrap();
            let _ = reader.read_frame();
            // Wait for the client to hang up.
            let _ = reader.read_frame();
        });

        let config = RelayConfig {
            request_timeout: Some(Duration::from_millis(50)),
            ..RelayConfig::default()
        };
        let client = RelayClient::from_stream(right, 0, &config).unwrap();
        let err = client.get_all().unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)));

        drop(client);
        owner.join().unwrap();
    }

    #[test]
    fn owner_errors_surface_as_owner_variant() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            hello_server(
                &mut reader,
                &mut writer,
                0,
                StoreConfig::default(),
                &HelloConfig::default(),
            )
            .unwrap();
            let frame = reader.read_frame().unwrap();
            let payload = serde_json::to_vec(&RelayResponse::error("disk on fire")).unwrap();
            writer.send(frame.request_id, &payload).unwrap();
            let _ = reader.read_frame();
        });

        let client = RelayClient::from_stream(right, 0, &RelayConfig::default()).unwrap();
        let err = client.create(jane()).unwrap_err();
        assert!(matches!(err, RelayError::Owner(msg) if msg == "disk on fire"));

        drop(client);
        owner.join().unwrap();
    }

    #[test]
    fn mismatched_action_is_rejected() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            hello_server(
                &mut reader,
                &mut writer,
                0,
                StoreConfig::default(),
                &HelloConfig::default(),
            )
            .unwrap();
            let frame = reader.read_frame().unwrap();
            let payload = serde_json::to_vec(&RelayResponse::Delete(true)).unwrap();
            writer.send(frame.request_id, &payload).unwrap();
            let _ = reader.read_frame();
        });

        let client = RelayClient::from_stream(right, 0, &RelayConfig::default()).unwrap();
        let err = client.get_all().unwrap_err();
        assert!(matches!(
            err,
            RelayError::UnexpectedResponse {
                expected: "getAll",
                actual: "delete"
            }
        ));

        drop(client);
        owner.join().unwrap();
    }

    #[test]
    fn hello_rejects_wrong_protocol_from_owner() {
        let (left, right) = UnixStream::pair().unwrap();
        let owner = thread::spawn(move || {
            let mut reader = FrameReader::new(left.try_clone().unwrap());
            let mut writer = FrameWriter::new(left);
            let _ = reader.read_frame().unwrap();
            let payload = serde_json::to_vec(&HelloResponse {
                protocol: "other".to_string(),
                version: "1.0".to_string(),
                owner: 0,
                capacity: 1,
                slot_width: 2,
            })
            .unwrap();
            writer.send(HELLO_ID, &payload).unwrap();
        });

        let result = RelayClient::from_stream(right, 0, &RelayConfig::default());
        owner.join().unwrap();
        assert!(matches!(result, Err(RelayError::HandshakeFailed(_))));
    }

    #[test]
    fn end_to_end_through_store_owner() {
        let sock_path = make_sock_path("e2e");
        let store = SlotStore::anonymous(StoreConfig::default()).unwrap();
        let mut owner = StoreOwner::bind(2, &sock_path, store, RelayConfig::default()).unwrap();

        let server = thread::spawn(move || {
            owner.accept_one().unwrap();
            // A second front-end sees what the first one wrote.
            owner.accept_one().unwrap();
            owner
        });

        let created = {
            let client = RelayClient::connect(&sock_path, 2, &RelayConfig::default()).unwrap();
            assert_eq!(client.hello().owner, 2);

            let created = client.create(jane()).unwrap();
            let updated = client
                .update(
                    &created.id,
                    UserPatch {
                        age: Some(42),
                        ..UserPatch::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.age, 42);
            created
        };

        let client =
            RelayClient::connect_with_retry(&sock_path, 2, &RelayConfig::default(), Duration::from_secs(2))
                .unwrap();
        let fetched = client.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.age, 42);
        assert_eq!(fetched.username, "Jane");
        assert_eq!(client.get_all().unwrap().len(), 1);
        assert!(client.delete(&created.id).unwrap());
        assert_eq!(client.get(&created.id).unwrap(), None);
        drop(client);

        let owner = server.join().unwrap();
        assert!(owner.store().get_all().is_empty());
        drop(owner);
        cleanup(&sock_path);
    }

    #[test]
    fn connect_with_retry_gives_up() {
        let sock_path = make_sock_path("retry");
        let started = Instant::now();
        let result = RelayClient::connect_with_retry(
            &sock_path,
            0,
            &RelayConfig::default(),
            Duration::from_millis(120),
        );
        assert!(matches!(
            result,
            Err(RelayError::Transport(TransportError::Connect { .. }))
        ));
        assert!(started.elapsed() >= Duration::from_millis(120));
        cleanup(&sock_path);
    }

    fn base36(mut value: usize) -> String {
        let mut digits = Vec::new();
        loop {
            digits.push(std::char::from_digit((value % 36) as u32, 36).unwrap());
            value /= 36;
            if value == 0 {
                break;
            }
        }
        digits.iter().rev().collect()
    }

    #[test]
    fn full_scan_beyond_default_payload_limit() {
        let geometry = StoreConfig {
            capacity: 70_000,
            slot_width: 256,
        };
        let mut store = SlotStore::anonymous(geometry).unwrap();
        let filler = "x".repeat(205);
        for slot in 0..geometry.capacity {
            store
                .put(&User {
                    id: base36(slot),
                    username: filler.clone(),
                    age: 1,
                    hobbies: Vec::new(),
                })
                .unwrap();
        }

        let sock_path = make_sock_path("fullscan");
        let mut owner = StoreOwner::bind(0, &sock_path, store, RelayConfig::default()).unwrap();
        let server = thread::spawn(move || owner.accept_one().unwrap());

        let client = RelayClient::connect(&sock_path, 0, &RelayConfig::default()).unwrap();
        let users = client.get_all().unwrap();
        assert_eq!(users.len(), geometry.capacity);
        assert!(serde_json::to_vec(&users).unwrap().len() > DEFAULT_MAX_PAYLOAD);

        // The connection survives the large reply.
        let first = client.get("0").unwrap().unwrap();
        assert_eq!(first.username, filler);
        assert!(!client.is_closed());

        drop(client);
        server.join().unwrap();
        cleanup(&sock_path);
    }
}
