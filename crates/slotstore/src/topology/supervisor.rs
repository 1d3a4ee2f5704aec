use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use slotstore_core::SlotStore;
use slotstore_relay::StoreOwner;
use slotstore_transport::SharedRegion;
use tracing::{debug, error, info, warn};

use crate::topology::config::TopologyConfig;
use crate::topology::error::{Result, TopologyError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const OWNER_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// A running front-end as the supervisor sees it.
pub trait FrontendProcess {
    /// True once the process has exited. Must not block.
    fn has_exited(&mut self) -> io::Result<bool>;
    /// Stop the process and reap it.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts front-ends for topology slots.
pub trait FrontendLauncher {
    type Process: FrontendProcess;

    fn launch(&mut self, slot: usize, config: &TopologyConfig) -> io::Result<Self::Process>;
}

impl FrontendProcess for Child {
    fn has_exited(&mut self) -> io::Result<bool> {
        match self.try_wait()? {
            Some(status) => {
                debug!(pid = self.id(), %status, "front-end process reaped");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        Child::kill(self)?;
        self.wait()?;
        Ok(())
    }
}

/// Launches front-ends by re-executing a binary with the hidden `frontend`
/// subcommand.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    extra_args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Launcher for the binary currently running.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Arguments appended to every launch (log settings, for example).
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn frontend_args(&self, slot: usize, config: &TopologyConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "frontend".into(),
            "--slot".into(),
            slot.to_string().into(),
            "--relay".into(),
            config.relay_socket(slot).into(),
            "--listen".into(),
            config.frontend_socket(slot).into(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl FrontendLauncher for ProcessLauncher {
    type Process = Child;

    fn launch(&mut self, slot: usize, config: &TopologyConfig) -> io::Result<Child> {
        Command::new(&self.program)
            .args(self.frontend_args(slot, config))
            .stdin(Stdio::null())
            .spawn()
    }
}

struct OwnerSlot {
    handle: Option<JoinHandle<slotstore_relay::Result<()>>>,
    running: Arc<AtomicBool>,
    started: Instant,
}

struct FrontendSlot<P> {
    process: Option<P>,
    started: Instant,
}

/// The primary: owns the region, runs one store owner thread and one
/// front-end per topology slot, and replaces whichever of them exits.
pub struct Supervisor<L: FrontendLauncher> {
    config: TopologyConfig,
    region: SharedRegion,
    launcher: L,
    owners: Vec<OwnerSlot>,
    frontends: Vec<FrontendSlot<L::Process>>,
    restarts: usize,
    stopped: bool,
}

impl<L: FrontendLauncher> Supervisor<L> {
    /// Allocate the region, bind every owner, then launch every front-end.
    pub fn start(config: TopologyConfig, mut launcher: L) -> Result<Self> {
        config.store.validate()?;
        std::fs::create_dir_all(&config.runtime_dir).map_err(|source| {
            TopologyError::RuntimeDir {
                path: config.runtime_dir.clone(),
                source,
            }
        })?;

        let region = SharedRegion::create(config.region_path(), config.store.region_len())?;
        info!(
            path = %config.region_path().display(),
            capacity = config.store.capacity,
            slot_width = config.store.slot_width,
            "store region allocated"
        );

        let mut owners = Vec::with_capacity(config.workers);
        for slot in 0..config.workers {
            owners.push(spawn_owner(&config, slot)?);
        }

        let mut frontends = Vec::with_capacity(config.workers);
        for slot in 0..config.workers {
            let process = launcher
                .launch(slot, &config)
                .map_err(|source| TopologyError::Frontend { slot, source })?;
            frontends.push(FrontendSlot {
                process: Some(process),
                started: Instant::now(),
            });
        }

        info!(workers = config.workers, "topology started");
        Ok(Self {
            config,
            region,
            launcher,
            owners,
            frontends,
            restarts: 0,
            stopped: false,
        })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn region(&self) -> &SharedRegion {
        &self.region
    }

    /// Number of replacement launches so far (owners and front-ends).
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Supervise until `running` turns false, then shut down.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            self.poll();
            thread::sleep(POLL_INTERVAL);
        }
        self.shutdown();
        Ok(())
    }

    /// Reap exited owners and front-ends and relaunch those whose back-off
    /// has elapsed.
    pub fn poll(&mut self) {
        for slot in 0..self.config.workers {
            self.poll_owner(slot);
            self.poll_frontend(slot);
        }
    }

    fn poll_owner(&mut self, slot: usize) {
        let owner = &mut self.owners[slot];
        if owner.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            match owner.handle.take().map(JoinHandle::join) {
                Some(Ok(Ok(()))) => warn!(slot, "store owner returned"),
                Some(Ok(Err(err))) => error!(slot, error = %err, "store owner failed"),
                Some(Err(_)) => error!(slot, "store owner panicked"),
                None => {}
            }
        }

        if owner.handle.is_some() || owner.started.elapsed() < self.config.restart_backoff {
            return;
        }
        match spawn_owner(&self.config, slot) {
            Ok(spawned) => {
                info!(slot, "store owner restarted");
                *owner = spawned;
                self.restarts += 1;
            }
            Err(err) => {
                owner.started = Instant::now();
                error!(slot, error = %err, "store owner restart failed");
            }
        }
    }

    fn poll_frontend(&mut self, slot: usize) {
        let frontend = &mut self.frontends[slot];
        if let Some(process) = frontend.process.as_mut() {
            match process.has_exited() {
                Ok(false) => return,
                Ok(true) => warn!(slot, "front-end exited"),
                Err(err) => warn!(slot, error = %err, "front-end status unavailable"),
            }
            frontend.process = None;
        }

        if frontend.started.elapsed() < self.config.restart_backoff {
            return;
        }
        frontend.started = Instant::now();
        match self.launcher.launch(slot, &self.config) {
            Ok(process) => {
                info!(slot, "front-end relaunched");
                frontend.process = Some(process);
                self.restarts += 1;
            }
            Err(err) => error!(slot, error = %err, "front-end relaunch failed"),
        }
    }

    /// Kill front-ends, stop owners and remove socket files. Idempotent.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        for (slot, frontend) in self.frontends.iter_mut().enumerate() {
            if let Some(mut process) = frontend.process.take() {
                if let Err(err) = process.kill() {
                    warn!(slot, error = %err, "failed to stop front-end");
                }
            }
        }
        for owner in &self.owners {
            owner.running.store(false, Ordering::SeqCst);
        }
        let deadline = Instant::now() + OWNER_STOP_TIMEOUT;
        for (slot, owner) in self.owners.iter_mut().enumerate() {
            let Some(handle) = owner.handle.take() else {
                continue;
            };
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if let Ok(Err(err)) = handle.join() {
                    warn!(slot, error = %err, "store owner stopped with error");
                }
            } else {
                warn!(slot, "store owner still attached at shutdown");
            }
        }
        // Sockets of killed front-ends and of owners that did not stop.
        for slot in 0..self.config.workers {
            let _ = std::fs::remove_file(self.config.relay_socket(slot));
            let _ = std::fs::remove_file(self.config.frontend_socket(slot));
        }
        info!("topology stopped");
    }
}

impl<L: FrontendLauncher> Drop for Supervisor<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Map the region and start the owner thread for `slot`.
///
/// The relay socket is bound before this returns, so a front-end launched
/// afterwards can connect right away.
fn spawn_owner(config: &TopologyConfig, slot: usize) -> Result<OwnerSlot> {
    let region = SharedRegion::open(config.region_path())?;
    let store = SlotStore::new(region, config.store)?;
    let mut owner = StoreOwner::bind(slot, config.relay_socket(slot), store, config.relay.clone())?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let name = format!("store-owner-{slot}");
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || owner.serve_until(&flag))
        .map_err(|source| TopologyError::Spawn { name, source })?;

    Ok(OwnerSlot {
        handle: Some(handle),
        running,
        started: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use slotstore_core::NewUser;
    use slotstore_relay::RelayClient;

    use super::*;

    #[derive(Clone, Default)]
    struct FakeLauncher {
        launched: Arc<Mutex<Vec<usize>>>,
        exit_flags: Arc<Mutex<Vec<(usize, Arc<AtomicBool>)>>>,
        killed: Arc<Mutex<Vec<usize>>>,
    }

    struct FakeProcess {
        slot: usize,
        exited: Arc<AtomicBool>,
        killed: Arc<Mutex<Vec<usize>>>,
    }

    impl FrontendProcess for FakeProcess {
        fn has_exited(&mut self) -> io::Result<bool> {
            Ok(self.exited.load(Ordering::SeqCst))
        }

        fn kill(&mut self) -> io::Result<()> {
            self.killed.lock().unwrap().push(self.slot);
            Ok(())
        }
    }

    impl FrontendLauncher for FakeLauncher {
        type Process = FakeProcess;

        fn launch(&mut self, slot: usize, _config: &TopologyConfig) -> io::Result<FakeProcess> {
            let exited = Arc::new(AtomicBool::new(false));
            self.launched.lock().unwrap().push(slot);
            self.exit_flags
                .lock()
                .unwrap()
                .push((slot, Arc::clone(&exited)));
            Ok(FakeProcess {
                slot,
                exited,
                killed: Arc::clone(&self.killed),
            })
        }
    }

    impl FakeLauncher {
        fn exit_latest(&self, slot: usize) {
            let flags = self.exit_flags.lock().unwrap();
            let (_, flag) = flags
                .iter()
                .rev()
                .find(|(s, _)| *s == slot)
                .expect("slot should have been launched");
            flag.store(true, Ordering::SeqCst);
        }

        fn launched(&self) -> Vec<usize> {
            self.launched.lock().unwrap().clone()
        }
    }

    fn scratch_config(tag: &str, backoff: Duration) -> TopologyConfig {
        let runtime_dir = PathBuf::from(format!(
            "/tmp/slotstore-topo-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        TopologyConfig {
            runtime_dir,
            workers: 2,
            restart_backoff: backoff,
            ..TopologyConfig::default()
        }
    }

    #[test]
    fn start_lays_out_runtime_dir_and_launches_each_slot() {
        let config = scratch_config("start", Duration::from_secs(3600));
        let launcher = FakeLauncher::default();
        let supervisor = Supervisor::start(config.clone(), launcher.clone()).unwrap();

        assert!(config.region_path().exists());
        assert!(config.relay_socket(0).exists());
        assert!(config.relay_socket(1).exists());
        assert_eq!(launcher.launched(), vec![0, 1]);
        assert_eq!(supervisor.region().len(), 256_000);

        drop(supervisor);
        assert!(!config.region_path().exists());
        assert_eq!(launcher.killed.lock().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[test]
    fn owners_share_one_region() {
        let config = scratch_config("shared", Duration::from_secs(3600));
        let supervisor = Supervisor::start(config.clone(), FakeLauncher::default()).unwrap();

        let first = RelayClient::connect(config.relay_socket(0), 0, &config.relay).unwrap();
        let created = first
            .create(NewUser {
                username: "shared".to_string(),
                age: 7,
                hobbies: vec![],
            })
            .unwrap();

        let second = RelayClient::connect(config.relay_socket(1), 1, &config.relay).unwrap();
        assert_eq!(second.hello().owner, 1);
        assert_eq!(second.get(&created.id).unwrap(), Some(created));

        drop(first);
        drop(second);
        drop(supervisor);
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[test]
    fn stopped_owner_is_respawned_on_same_socket() {
        let config = scratch_config("owner-restart", Duration::ZERO);
        let mut supervisor = Supervisor::start(config.clone(), FakeLauncher::default()).unwrap();

        let created = {
            let client = RelayClient::connect(config.relay_socket(0), 0, &config.relay).unwrap();
            client
                .create(NewUser {
                    username: "survivor".to_string(),
                    age: 12,
                    hobbies: vec!["rowing".to_string()],
                })
                .unwrap()
        };

        supervisor.owners[0].running.store(false, Ordering::SeqCst);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !supervisor.owners[0]
            .handle
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
        {
            assert!(Instant::now() < deadline, "owner did not stop");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!config.relay_socket(0).exists());

        supervisor.poll();
        assert_eq!(supervisor.restarts(), 1);
        assert!(config.relay_socket(0).exists());

        let client = RelayClient::connect(config.relay_socket(0), 0, &config.relay).unwrap();
        assert_eq!(client.hello().owner, 0);
        assert_eq!(client.get(&created.id).unwrap(), Some(created));

        drop(client);
        drop(supervisor);
        assert!(!config.relay_socket(0).exists());
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[test]
    fn exited_frontend_is_relaunched_at_same_slot() {
        let config = scratch_config("relaunch", Duration::ZERO);
        let launcher = FakeLauncher::default();
        let mut supervisor = Supervisor::start(config.clone(), launcher.clone()).unwrap();

        launcher.exit_latest(1);
        supervisor.poll();

        assert_eq!(launcher.launched(), vec![0, 1, 1]);
        assert_eq!(supervisor.restarts(), 1);

        supervisor.poll();
        assert_eq!(launcher.launched(), vec![0, 1, 1]);

        drop(supervisor);
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[test]
    fn relaunch_waits_for_backoff() {
        let config = scratch_config("backoff", Duration::from_secs(3600));
        let launcher = FakeLauncher::default();
        let mut supervisor = Supervisor::start(config.clone(), launcher.clone()).unwrap();

        launcher.exit_latest(0);
        supervisor.poll();

        assert_eq!(launcher.launched(), vec![0, 1]);
        assert_eq!(supervisor.restarts(), 0);

        drop(supervisor);
        let _ = std::fs::remove_dir_all(&config.runtime_dir);
    }

    #[test]
    fn frontend_args_point_at_slot_sockets() {
        let config = scratch_config("args", Duration::ZERO);
        let launcher = ProcessLauncher::new("/bin/true").with_args(["--log-level", "debug"]);
        let args = launcher.frontend_args(3, &config);

        let expected: Vec<OsString> = vec![
            "frontend".into(),
            "--slot".into(),
            "3".into(),
            "--relay".into(),
            config.relay_socket(3).into(),
            "--listen".into(),
            config.frontend_socket(3).into(),
            "--log-level".into(),
            "debug".into(),
        ];
        assert_eq!(args, expected);
    }
}
