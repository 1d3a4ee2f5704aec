use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use slotstore::store::StoreConfig;
use slotstore::topology::{
    config::default_runtime_dir, config::default_workers, run_standalone, ProcessLauncher,
    Supervisor, TopologyConfig,
};
use tracing::info;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{io_error, store_error, topology_error, CliError, CliResult, SUCCESS, USAGE};
use crate::logging::LogSettings;

pub fn run(args: ServeArgs, log: LogSettings) -> CliResult<i32> {
    let store = StoreConfig {
        capacity: args.capacity,
        slot_width: args.slot_width,
    };
    store
        .validate()
        .map_err(|err| store_error("invalid store geometry", err))?;

    let runtime_dir = args.runtime_dir.unwrap_or_else(default_runtime_dir);
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    if args.standalone {
        info!(runtime_dir = %runtime_dir.display(), "starting standalone");
        run_standalone(&runtime_dir, store, &running)
            .map_err(|err| topology_error("standalone failed", err))?;
        return Ok(SUCCESS);
    }

    let workers = args.workers.unwrap_or_else(default_workers);
    if workers == 0 {
        return Err(CliError::new(USAGE, "--workers must be at least 1"));
    }
    let config = TopologyConfig {
        runtime_dir,
        workers,
        store,
        restart_backoff: parse_duration(&args.restart_backoff)?,
        ..TopologyConfig::default()
    };

    let launcher = ProcessLauncher::current_exe()
        .map_err(|err| io_error("cannot locate own executable", err))?
        .with_args(log.child_args());
    let mut supervisor = Supervisor::start(config, launcher)
        .map_err(|err| topology_error("startup failed", err))?;
    supervisor
        .run(&running)
        .map_err(|err| topology_error("supervision failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
