use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use slotstore::relay::RelayConfig;
use slotstore::topology::{run_frontend, FrontendOptions};

use crate::cmd::{parse_duration, FrontendArgs};
use crate::exit::{topology_error, CliResult, SUCCESS};

pub fn run(args: FrontendArgs) -> CliResult<i32> {
    let options = FrontendOptions {
        slot: args.slot,
        relay_socket: args.relay,
        listen_socket: args.listen,
        relay: RelayConfig::default(),
        connect_timeout: parse_duration(&args.connect_timeout)?,
    };

    // Stopped by the supervisor with a kill, or by losing the relay.
    let running = Arc::new(AtomicBool::new(true));
    run_frontend(&options, running).map_err(|err| topology_error("front-end stopped", err))?;
    Ok(SUCCESS)
}
