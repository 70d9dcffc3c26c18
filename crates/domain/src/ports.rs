//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Collection, InboundMessage, Post, StatusBody};

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Port for persisting the `posts` and `archived` collections
///
/// Every call is atomic on its own: a concurrent `read` never observes a
/// partially written collection. Atomicity does not extend across calls.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a collection; `None` if it was never written
    async fn read(&self, collection: Collection) -> Result<Option<Vec<Post>>, StoreError>;

    /// Replace a collection
    async fn write(&self, collection: Collection, posts: Vec<Post>) -> Result<(), StoreError>;

    /// Replace several collections in one atomic step
    async fn write_batch(&self, batch: Vec<(Collection, Vec<Post>)>) -> Result<(), StoreError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limited")]
    RateLimited,
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific status ID
    pub id: String,
    /// URL to the published status, if available
    pub url: Option<String>,
}

/// Port for the remote publish API
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Publish one status; a single attempt, no retries
    async fn publish(&self, body: &StatusBody) -> Result<PublishResult, PublishError>;

    /// Get the platform name (e.g., "mastodon")
    fn platform(&self) -> &'static str;
}

/// Error type for chat transport operations
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// Port for the chat channel commands arrive on
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Wait for the next inbound message; `None` once the transport is closed
    async fn next_message(&self) -> Result<Option<InboundMessage>, ChatError>;

    /// Send a message to a channel
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChatError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
