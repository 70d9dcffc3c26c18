//! Fakes shared by the use case tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

use crate::model::{Collection, InboundMessage, Post, StatusBody};
use crate::ports::{
    ChatError, ChatTransport, Clock, PublishError, PublishResult, StatusPublisher, Store,
    StoreError,
};
use crate::usecases::lifecycle::PostLifecycle;

pub(crate) type FakeLifecycle = PostLifecycle<FakeStore, FakePublisher, FakeClock>;

/// Build a lifecycle manager over fresh fakes
pub(crate) fn lifecycle(
    publisher: FakePublisher,
) -> (FakeLifecycle, Arc<FakeStore>, Arc<FakePublisher>) {
    let store = Arc::new(FakeStore::default());
    let publisher = Arc::new(publisher);
    let manager = PostLifecycle::new(
        Arc::clone(&store),
        Arc::clone(&publisher),
        Arc::new(FakeClock::new()),
    );
    (manager, store, publisher)
}

#[derive(Default)]
pub(crate) struct FakeStore {
    collections: Mutex<HashMap<Collection, Vec<Post>>>,
    fail_writes: AtomicBool,
}

impl FakeStore {
    pub(crate) fn raw(&self, collection: Collection) -> Option<Vec<Post>> {
        self.collections.lock().unwrap().get(&collection).cloned()
    }

    pub(crate) fn collection(&self, collection: Collection) -> Vec<Post> {
        self.raw(collection).unwrap_or_default()
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<Post>>, StoreError> {
        Ok(self.raw(collection))
    }

    async fn write(&self, collection: Collection, posts: Vec<Post>) -> Result<(), StoreError> {
        self.check_writable()?;
        self.collections.lock().unwrap().insert(collection, posts);
        Ok(())
    }

    async fn write_batch(&self, batch: Vec<(Collection, Vec<Post>)>) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut collections = self.collections.lock().unwrap();
        for (collection, posts) in batch {
            collections.insert(collection, posts);
        }
        Ok(())
    }
}

/// Publisher that records bodies; fails for bodies containing a marker
pub(crate) struct FakePublisher {
    fail_all: bool,
    fail_marker: Option<String>,
    delay: Option<Duration>,
    published: Mutex<Vec<String>>,
    attempts: AtomicU64,
}

impl FakePublisher {
    pub(crate) fn ok() -> Self {
        Self {
            fail_all: false,
            fail_marker: None,
            delay: None,
            published: Mutex::new(vec![]),
            attempts: AtomicU64::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::ok()
        }
    }

    pub(crate) fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::ok()
        }
    }

    /// Answer each publish only after `delay`, like a slow remote
    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub(crate) fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_for_attempts(&self, count: u64) {
        while self.attempts() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl StatusPublisher for FakePublisher {
    async fn publish(&self, body: &StatusBody) -> Result<PublishResult, PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let marked = self
            .fail_marker
            .as_deref()
            .is_some_and(|marker| body.as_str().contains(marker));
        if self.fail_all || marked {
            return Err(PublishError::Api {
                status: 500,
                body: "boom".to_string(),
            });
        }

        let mut published = self.published.lock().unwrap();
        published.push(body.as_str().to_string());
        Ok(PublishResult {
            id: format!("status_{}", published.len()),
            url: None,
        })
    }

    fn platform(&self) -> &'static str {
        "fake"
    }
}

/// Clock that advances one second per reading
pub(crate) struct FakeClock {
    next: AtomicU64,
}

impl FakeClock {
    pub(crate) const START: u64 = 1_500_000_000;

    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(Self::START),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        let seconds = self.next.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::from_unix_timestamp(seconds as i64).unwrap()
    }
}

/// Transport replaying scripted messages and capturing replies
#[derive(Default)]
pub(crate) struct FakeTransport {
    inbound: Mutex<VecDeque<Result<InboundMessage, ChatError>>>,
    sent: Mutex<Vec<(String, String)>>,
    held_open: bool,
}

impl FakeTransport {
    pub(crate) fn with_messages(messages: Vec<InboundMessage>) -> Self {
        Self {
            inbound: Mutex::new(messages.into_iter().map(Ok).collect()),
            sent: Mutex::new(vec![]),
            held_open: false,
        }
    }

    /// Like `with_messages`, but waits forever once the script runs out
    pub(crate) fn held_open(messages: Vec<InboundMessage>) -> Self {
        Self {
            held_open: true,
            ..Self::with_messages(messages)
        }
    }

    pub(crate) fn push_error(&self, error: ChatError) {
        self.inbound.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn next_message(&self) -> Result<Option<InboundMessage>, ChatError> {
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(error)) => Err(error),
            None if self.held_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}
