//! Chat transport adapters

mod console;
mod slack;

pub use console::{CONSOLE_CHANNEL, ConsoleTransport};
pub use slack::SlackTransport;
