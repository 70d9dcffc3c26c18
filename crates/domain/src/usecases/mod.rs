//! Application use cases / business logic

pub mod command;
pub mod dispatch;
pub mod lifecycle;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{Command, parse_command};
pub use dispatch::Dispatcher;
pub use lifecycle::{LifecycleError, PostLifecycle, read_snapshot};
pub use scheduler::{Scheduler, TickReport};

use tokio::sync::watch;

/// Resolves once shutdown is requested or the sender is gone
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
