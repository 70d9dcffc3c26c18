//! Command dispatcher - routes parsed chat commands to the lifecycle manager

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::{
    model::{InboundMessage, Post, Reply},
    ports::{ChatError, ChatTransport, Clock, StatusPublisher, Store},
    usecases::{
        command::{Command, parse_command},
        lifecycle::{LifecycleError, PostLifecycle},
        stop_requested,
    },
};

/// Pause after a failed receive before asking the transport again
const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

/// Maps chat messages onto lifecycle operations and formats replies
pub struct Dispatcher<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    lifecycle: Arc<PostLifecycle<St, P, Cl>>,
    receive_backoff: Duration,
}

impl<St, P, Cl> Dispatcher<St, P, Cl>
where
    St: Store + ?Sized,
    P: StatusPublisher + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(lifecycle: Arc<PostLifecycle<St, P, Cl>>) -> Self {
        Self {
            lifecycle,
            receive_backoff: RECEIVE_BACKOFF,
        }
    }

    pub fn with_receive_backoff(mut self, backoff: Duration) -> Self {
        self.receive_backoff = backoff;
        self
    }

    /// Execute the command in `message`, if any, and build the reply
    pub async fn reply_to(&self, message: &InboundMessage) -> Option<Reply> {
        let command = parse_command(&message.text);

        let outcome = match command {
            Command::Create { url } => self
                .lifecycle
                .create(&url)
                .await
                .map(|post| status("post added", &post)),
            Command::Annotate { id, text } => self
                .lifecycle
                .annotate(id, &text)
                .await
                .map(|post| status("post updated", &post)),
            Command::Publish { id } => self
                .lifecycle
                .publish(id)
                .await
                .map(|post| status("post published", &post)),
            Command::Unrecognized => return None,
        };

        Some(outcome.unwrap_or_else(|e| error_reply(&message.channel, e)))
    }

    /// Handle one message and send the reply to its channel
    pub async fn handle<T>(&self, message: &InboundMessage, transport: &T) -> Result<(), ChatError>
    where
        T: ChatTransport + ?Sized,
    {
        let Some(reply) = self.reply_to(message).await else {
            return Ok(());
        };

        transport
            .send_message(&message.channel, &reply.to_string())
            .await
    }

    /// Process messages until the transport closes or shutdown is requested
    ///
    /// Shutdown is only observed while waiting for the next message. A
    /// command that is already running, including its remote publish and
    /// reply, always completes.
    pub async fn serve<T>(
        &self,
        transport: &T,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ChatError>
    where
        T: ChatTransport + ?Sized,
    {
        loop {
            let received = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    tracing::info!("Chat loop stopped");
                    return Ok(());
                }
                received = transport.next_message() => received,
            };

            let message = match received {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Chat transport closed");
                    return Ok(());
                }
                Err(ChatError::Auth(reason)) => return Err(ChatError::Auth(reason)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to receive chat message");
                    tokio::select! {
                        _ = stop_requested(&mut shutdown) => {}
                        _ = tokio::time::sleep(self.receive_backoff) => {}
                    }
                    continue;
                }
            };

            tracing::debug!(channel = %message.channel, text = %message.text, "Received message");

            if let Err(e) = self.handle(&message, transport).await {
                tracing::error!(channel = %message.channel, error = %e, "Failed to send reply");
            }
        }
    }
}

fn status(action: &str, post: &Post) -> Reply {
    let json = serde_json::to_string(post).unwrap_or_else(|_| format!("{{\"id\":{}}}", post.id));
    Reply::Status(format!("{} {}", action, json))
}

fn error_reply(channel: &str, error: LifecycleError) -> Reply {
    tracing::warn!(channel = %channel, error = %error, "Command failed");
    Reply::Error(error.to_string())
}
