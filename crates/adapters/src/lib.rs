//! tootbridge adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: JSON file, SQLite and in-memory stores
//! - `mastodon`: Mastodon status publisher
//! - `chat`: Slack and console chat transports

mod store_json;
mod store_memory;
mod store_sqlite;

pub mod chat;
pub mod mastodon;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_json::JsonFileStore;
    pub use crate::store_memory::InMemoryStore;
    pub use crate::store_sqlite::SqliteStore;
}
