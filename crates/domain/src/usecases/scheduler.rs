//! Scheduler use case - publishes every ready post on each tick

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::{
    model::Post,
    ports::{Clock, StatusPublisher, Store},
    usecases::{
        lifecycle::{LifecycleError, PostLifecycle},
        stop_requested,
    },
};

/// Outcome of one scheduler tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Posts published and archived during the tick
    pub published: Vec<Post>,
    /// Posts whose publish attempt failed, with the reason
    pub failed: Vec<(u64, LifecycleError)>,
}

impl TickReport {
    pub fn attempted(&self) -> usize {
        self.published.len() + self.failed.len()
    }
}

/// Periodic scan-and-publish cycle
pub struct Scheduler<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    lifecycle: Arc<PostLifecycle<St, P, Cl>>,
}

impl<St, P, Cl> Scheduler<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(lifecycle: Arc<PostLifecycle<St, P, Cl>>) -> Self {
        Self { lifecycle }
    }

    /// Run one tick
    ///
    /// Each ready post is attempted independently; a failure is logged and
    /// the remaining posts are still tried. Only failing to list the ready
    /// posts fails the tick as a whole.
    pub async fn tick(&self) -> Result<TickReport, LifecycleError> {
        tracing::info!("Looking for scheduled posts");

        let ready = self.lifecycle.list_ready().await?;
        let mut report = TickReport::default();

        for post in ready {
            match self.lifecycle.publish(post.id).await {
                Ok(published) => {
                    tracing::info!(post_id = published.id, "Scheduled post published");
                    report.published.push(published);
                }
                Err(e) => {
                    tracing::error!(post_id = post.id, error = %e, "Scheduled publish failed");
                    report.failed.push((post.id, e));
                }
            }
        }

        Ok(report)
    }

    /// Tick every `period` until shutdown is requested
    ///
    /// The first tick fires one period after start. Shutdown is checked only
    /// between ticks, so a tick that has started always runs to completion.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(report) if report.attempted() > 0 => {
                    tracing::info!(
                        published = report.published.len(),
                        failed = report.failed.len(),
                        "Scheduler tick complete"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Scheduler tick failed"),
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Collection;
    use crate::usecases::testing::{FakePublisher, lifecycle};

    #[tokio::test]
    async fn test_tick_publishes_ready_posts_only() {
        let (manager, store, publisher) = lifecycle(FakePublisher::ok());
        let draft = manager.create("http://draft").await.unwrap();
        let ready = manager.create("http://ready").await.unwrap();
        manager.annotate(ready.id, "go").await.unwrap();

        let scheduler = Scheduler::new(Arc::new(manager));
        let report = scheduler.tick().await.unwrap();

        assert_eq!(report.published.len(), 1);
        assert_eq!(report.published[0].id, ready.id);
        assert!(report.failed.is_empty());
        assert_eq!(store.collection(Collection::Posts), vec![draft]);
        assert_eq!(publisher.published(), vec!["go\n\nhttp://ready".to_string()]);
    }

    #[tokio::test]
    async fn test_tick_continues_after_failure() {
        let (manager, store, publisher) = lifecycle(FakePublisher::failing_on("broken"));
        let a = manager.create("http://a").await.unwrap();
        let b = manager.create("http://b").await.unwrap();
        let c = manager.create("http://c").await.unwrap();
        manager.annotate(a.id, "first").await.unwrap();
        let b = manager.annotate(b.id, "broken").await.unwrap();
        manager.annotate(c.id, "third").await.unwrap();

        let scheduler = Scheduler::new(Arc::new(manager));
        let report = scheduler.tick().await.unwrap();

        assert_eq!(report.attempted(), 3);
        let published: Vec<u64> = report.published.iter().map(|p| p.id).collect();
        assert_eq!(published, vec![a.id, c.id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, b.id);
        assert!(matches!(report.failed[0].1, LifecycleError::Publish(_)));

        assert_eq!(store.collection(Collection::Posts), vec![b]);
        assert_eq!(store.collection(Collection::Archived).len(), 2);
        assert_eq!(publisher.attempts(), 3);
    }

    #[tokio::test]
    async fn test_failed_post_is_retried_next_tick() {
        let (manager, store, _) = lifecycle(FakePublisher::failing());
        let post = manager.create("http://a").await.unwrap();
        manager.annotate(post.id, "text").await.unwrap();

        let scheduler = Scheduler::new(Arc::new(manager));
        let first = scheduler.tick().await.unwrap();
        let second = scheduler.tick().await.unwrap();

        assert_eq!(first.failed.len(), 1);
        assert_eq!(second.failed.len(), 1);
        assert_eq!(store.collection(Collection::Posts).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_tick() {
        let (manager, _, publisher) = lifecycle(FakePublisher::ok());
        let scheduler = Scheduler::new(Arc::new(manager));

        let report = scheduler.tick().await.unwrap();

        assert_eq!(report.attempted(), 0);
        assert_eq!(publisher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_running_tick() {
        let (manager, store, publisher) =
            lifecycle(FakePublisher::ok().with_delay(Duration::from_millis(100)));
        let post = manager.create("http://x").await.unwrap();
        manager.annotate(post.id, "hello").await.unwrap();
        let scheduler = Scheduler::new(Arc::new(manager));
        let (stop, shutdown) = watch::channel(false);

        let stopping = async {
            publisher.wait_for_attempts(1).await;
            stop.send_replace(true);
        };
        tokio::join!(scheduler.run(Duration::from_millis(10), shutdown), stopping);

        assert_eq!(publisher.published(), vec!["hello\n\nhttp://x".to_string()]);
        assert!(store.collection(Collection::Posts).is_empty());
        assert_eq!(store.collection(Collection::Archived).len(), 1);

        // Nothing is left for a restarted scheduler to publish again
        let report = scheduler.tick().await.unwrap();
        assert_eq!(report.attempted(), 0);
        assert_eq!(publisher.attempts(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick_publishes_nothing() {
        let (manager, store, publisher) = lifecycle(FakePublisher::ok());
        let post = manager.create("http://x").await.unwrap();
        manager.annotate(post.id, "hello").await.unwrap();
        let scheduler = Scheduler::new(Arc::new(manager));
        let (stop, shutdown) = watch::channel(false);
        stop.send_replace(true);

        scheduler.run(Duration::from_secs(3600), shutdown).await;

        assert_eq!(publisher.attempts(), 0);
        assert_eq!(store.collection(Collection::Posts).len(), 1);
    }
}
