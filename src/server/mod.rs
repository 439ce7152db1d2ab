pub mod error;
pub mod handler;
pub mod listener;
pub mod manager;
pub mod signal;
pub mod watcher;

pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use handler::{RequestHandler, NOT_FOUND_BODY};
pub use listener::ServerInstance;
pub use manager::{LifecycleState, ServerManager};
pub use signal::{spawn_signal_handler, wait_for_signal, Shutdown};
pub use watcher::{routing_table_channel, ConfigurationWatcher, ReloadOutcome, TableReceiver, TableSender};
