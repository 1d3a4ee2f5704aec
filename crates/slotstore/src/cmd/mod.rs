use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::logging::LogSettings;
use crate::output::OutputFormat;

pub mod frontend;
pub mod serve;
pub mod users;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the primary: store region, store owners and front-ends.
    Serve(ServeArgs),
    /// Run one front-end (started by `serve`).
    #[command(hide = true)]
    Frontend(FrontendArgs),
    /// Call a front-end's gateway socket.
    Users(UsersArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, log: LogSettings) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, log),
        Command::Frontend(args) => frontend::run(args),
        Command::Users(args) => users::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory for the region file and sockets.
    #[arg(long, env = "SLOTSTORE_RUNTIME_DIR", value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,
    /// Number of front-end / store owner pairs. Default: available CPUs.
    #[arg(long, env = "SLOTSTORE_WORKERS")]
    pub workers: Option<usize>,
    /// Number of record slots.
    #[arg(long, env = "SLOTSTORE_CAPACITY", default_value_t = slotstore::store::DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Width of one slot in bytes.
    #[arg(long, env = "SLOTSTORE_SLOT_WIDTH", default_value_t = slotstore::store::DEFAULT_SLOT_WIDTH)]
    pub slot_width: usize,
    /// Serve from a single process without owners or children.
    #[arg(long, env = "SLOTSTORE_STANDALONE")]
    pub standalone: bool,
    /// Minimum delay before relaunching at the same slot (e.g. 250ms, 1s).
    #[arg(long, default_value = "250ms")]
    pub restart_backoff: String,
}

#[derive(Args, Debug)]
pub struct FrontendArgs {
    /// Topology slot of this front-end.
    #[arg(long)]
    pub slot: usize,
    /// Relay socket of the paired store owner.
    #[arg(long, value_name = "PATH")]
    pub relay: PathBuf,
    /// Gateway socket to bind.
    #[arg(long, value_name = "PATH")]
    pub listen: PathBuf,
    /// How long to retry the relay socket at startup (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    /// Gateway socket of a front-end.
    #[arg(long, env = "SLOTSTORE_SOCKET", value_name = "PATH")]
    pub socket: PathBuf,
    /// Maximum time to wait for an answer (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(subcommand)]
    pub action: UsersAction,
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    /// List every stored user.
    List,
    /// Fetch one user.
    Get { id: String },
    /// Create a user from a JSON body.
    Create {
        /// Body with username, age and hobbies.
        #[arg(long)]
        json: String,
    },
    /// Update some fields of a user.
    Update {
        id: String,
        /// Body with the fields to change.
        #[arg(long)]
        json: String,
    },
    /// Delete a user.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
