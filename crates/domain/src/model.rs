//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// A post tracked by the bridge
///
/// Records persisted before `text` was set have no `text` key at all, so the
/// field is optional on both the read and the write side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Creation time in seconds since the Unix epoch, doubles as the identifier
    pub id: u64,
    /// Link the post references
    pub url: String,
    /// Post body; absent or empty while the post is still a draft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Post {
    /// Create a draft post
    pub fn draft(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            text: None,
        }
    }

    /// Copy of this post with `text` replaced
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            id: self.id,
            url: self.url.clone(),
            text: Some(text.into()),
        }
    }

    /// Readiness predicate shared by manual and scheduled publishing
    pub fn is_ready(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.is_empty())
    }

    /// Derived lifecycle state of a post still in the `posts` collection
    pub fn state(&self) -> PostState {
        if self.is_ready() {
            PostState::Ready
        } else {
            PostState::Draft
        }
    }

    /// Outbound status body: text, a blank line, then the url
    ///
    /// Returns `None` for drafts.
    pub fn status_body(&self) -> Option<StatusBody> {
        if !self.is_ready() {
            return None;
        }
        let text = self.text.as_deref().unwrap_or_default();
        Some(StatusBody(format!("{}\n\n{}", text, self.url)))
    }
}

/// Lifecycle state derived from field presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostState {
    Draft,
    Ready,
}

/// Named collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Drafts and ready posts, in creation order
    Posts,
    /// Published posts, append-only
    Archived,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Posts, Collection::Archived];

    /// Key used in persisted state
    pub fn name(self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Archived => "archived",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text sent to the remote publish API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBody(pub String);

impl StatusBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Contents of both collections at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub archived: Vec<Post>,
}

/// A chat message delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub channel: String,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: channel.into(),
        }
    }
}

/// Reply sent back to the originating channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(message) => write!(f, "[STATUS] {}", message),
            Reply::Error(message) => write!(f, "[ERROR] {}", message),
        }
    }
}
