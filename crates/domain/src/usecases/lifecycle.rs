//! Post lifecycle use case - create, annotate, publish and archive posts
//!
//! Every operation is a read-modify-write against the [`Store`]. The store
//! only guarantees atomicity per call, so all operations run under one
//! in-process lock held across the whole read+write pair (including the
//! outbound publish call). Operations are therefore totally ordered and the
//! chat path and the scheduler can never interleave.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    model::{Collection, Post, Snapshot},
    ports::{Clock, PublishError, StatusPublisher, Store, StoreError},
};

/// Errors from lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("can't find post with id {id}")]
    NotFound { id: u64 },
    #[error("post {id} is not ready for publishing")]
    NotReady { id: u64 },
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Owner of the post invariants and all state transitions
pub struct PostLifecycle<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    publisher: Arc<P>,
    clock: Arc<Cl>,
    db_lock: Mutex<()>,
}

impl<St, P, Cl> PostLifecycle<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, publisher: Arc<P>, clock: Arc<Cl>) -> Self {
        Self {
            store,
            publisher,
            clock,
            db_lock: Mutex::new(()),
        }
    }

    /// Create a draft post for `url`
    ///
    /// The id is the current time in whole seconds. Two creates within the
    /// same second produce the same id; this is a known limitation.
    pub async fn create(&self, url: &str) -> Result<Post, LifecycleError> {
        let _guard = self.db_lock.lock().await;

        let mut posts = self.read_or_empty(Collection::Posts).await?;
        let id = u64::try_from(self.clock.now().unix_timestamp()).unwrap_or_default();
        let post = Post::draft(id, url);
        posts.push(post.clone());

        self.store.write(Collection::Posts, posts).await?;

        tracing::info!(post_id = post.id, url = %post.url, "Created post");
        Ok(post)
    }

    /// Set the text of a post that has not been published yet
    pub async fn annotate(&self, id: u64, text: &str) -> Result<Post, LifecycleError> {
        let _guard = self.db_lock.lock().await;

        let mut posts = self.read_or_empty(Collection::Posts).await?;
        let slot = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LifecycleError::NotFound { id })?;

        let updated = slot.with_text(text);
        *slot = updated.clone();

        self.store.write(Collection::Posts, posts).await?;

        tracing::info!(post_id = id, ready = updated.is_ready(), "Updated post");
        Ok(updated)
    }

    /// Publish a ready post and move it into the archive
    ///
    /// On a publisher failure neither collection is touched, so the post
    /// stays ready and a later call can retry it.
    pub async fn publish(&self, id: u64) -> Result<Post, LifecycleError> {
        let _guard = self.db_lock.lock().await;

        let mut posts = self.read_or_empty(Collection::Posts).await?;
        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(LifecycleError::NotFound { id })?;

        let Some(body) = posts[index].status_body() else {
            return Err(LifecycleError::NotReady { id });
        };

        let mut archived = self.read_or_empty(Collection::Archived).await?;

        let result = self.publisher.publish(&body).await.map_err(|e| {
            tracing::warn!(
                post_id = id,
                platform = self.publisher.platform(),
                error = %e,
                "Remote publish failed"
            );
            e
        })?;

        let post = posts.remove(index);
        archived.push(post.clone());

        if let Err(e) = self
            .store
            .write_batch(vec![
                (Collection::Posts, posts),
                (Collection::Archived, archived),
            ])
            .await
        {
            tracing::error!(
                post_id = id,
                status_id = %result.id,
                error = %e,
                "Published but failed to archive post"
            );
            return Err(e.into());
        }

        tracing::info!(
            post_id = id,
            platform = self.publisher.platform(),
            status_id = %result.id,
            status_url = ?result.url,
            "Published post"
        );
        Ok(post)
    }

    /// Posts that are ready for publishing, in creation order
    pub async fn list_ready(&self) -> Result<Vec<Post>, LifecycleError> {
        let _guard = self.db_lock.lock().await;

        let posts = self.read_or_empty(Collection::Posts).await?;
        Ok(posts.into_iter().filter(Post::is_ready).collect())
    }

    async fn read_or_empty(&self, collection: Collection) -> Result<Vec<Post>, StoreError> {
        Ok(self.store.read(collection).await?.unwrap_or_default())
    }
}

/// Read both collections for inspection, treating absent ones as empty
///
/// Runs outside the lifecycle lock; meant for read-only tooling.
pub async fn read_snapshot<St>(store: &St) -> Result<Snapshot, StoreError>
where
    St: Store + ?Sized,
{
    Ok(Snapshot {
        posts: store.read(Collection::Posts).await?.unwrap_or_default(),
        archived: store.read(Collection::Archived).await?.unwrap_or_default(),
    })
}
