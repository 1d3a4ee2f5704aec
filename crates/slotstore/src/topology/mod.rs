//! Process topology: the primary, its store owners and the front-ends.
//!
//! The primary allocates the region once (a file in the runtime directory),
//! runs one [`StoreOwner`](slotstore_relay::StoreOwner) thread per slot and
//! launches one front-end process per slot. Each front-end attaches to its
//! owner over `relay-<n>.sock` and serves callers on `frontend-<n>.sock`.

pub mod config;
pub mod error;
pub mod frontend;
pub mod standalone;
pub mod supervisor;

pub use config::{frontend_socket, relay_socket, TopologyConfig};
pub use error::{Result, TopologyError};
pub use frontend::{run_frontend, FrontendOptions};
pub use standalone::run_standalone;
pub use supervisor::{FrontendLauncher, FrontendProcess, ProcessLauncher, Supervisor};
