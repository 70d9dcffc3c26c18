//! Slack Web API transport
//!
//! Polls `conversations.history` for each configured channel and replies with
//! `chat.postMessage`. Only plain user messages are delivered: anything with a
//! `subtype` (joins, edits, ...) or a `bot_id` (including our own replies) is
//! skipped, but still advances the per-channel cursor.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tootbridge_domain::{ChatError, ChatTransport, InboundMessage};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";
const HISTORY_LIMIT: &str = "200";

/// Slack error codes that mean the token is unusable
const AUTH_ERRORS: [&str; 4] = [
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
];

/// Slack transport using the Web API
pub struct SlackTransport {
    client: Client,
    bot_token: SecretString,
    base_url: String,
    channels: Vec<String>,
    poll_interval: Duration,
    state: Mutex<PollState>,
}

struct PollState {
    /// Newest `ts` seen per channel
    cursors: HashMap<String, String>,
    pending: VecDeque<InboundMessage>,
    polled: bool,
}

impl SlackTransport {
    pub fn new(
        bot_token: SecretString,
        channels: Vec<String>,
        poll_interval: Duration,
    ) -> Result<Self, ChatError> {
        Self::with_base_url(
            bot_token,
            DEFAULT_BASE_URL.to_string(),
            channels,
            poll_interval,
        )
    }

    pub fn with_base_url(
        bot_token: SecretString,
        base_url: String,
        channels: Vec<String>,
        poll_interval: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::Network(format!("Failed to build HTTP client: {}", e)))?;

        // Start from "now" so history from before startup is not replayed
        let start = slack_ts(OffsetDateTime::now_utc());
        let cursors = channels
            .iter()
            .map(|channel| (channel.clone(), start.clone()))
            .collect();

        Ok(Self {
            client,
            bot_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            channels,
            poll_interval,
            state: Mutex::new(PollState {
                cursors,
                pending: VecDeque::new(),
                polled: false,
            }),
        })
    }

    /// Verify the token; returns the bot user name
    pub async fn connect(&self) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/auth.test", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let auth: AuthTestResponse = parse_response(response).await?;
        check_ok(auth.ok, auth.error)?;

        let name = auth.user.unwrap_or_else(|| "unknown".to_string());
        tracing::info!(
            bot = %name,
            team = ?auth.team,
            channels = ?self.channels,
            "Logged in to Slack"
        );
        Ok(name)
    }

    async fn poll_channels(&self, state: &mut PollState) -> Result<(), ChatError> {
        for channel in &self.channels {
            let oldest = state.cursors.get(channel).cloned();
            let (messages, newest) = self.fetch_history(channel, oldest.as_deref()).await?;

            if let Some(newest) = newest {
                state.cursors.insert(channel.clone(), newest);
            }
            state.pending.extend(messages);
        }
        Ok(())
    }

    /// Messages newer than `oldest`, oldest first, plus the newest `ts` seen
    ///
    /// Follows `next_cursor` until every page since `oldest` has been read.
    async fn fetch_history(
        &self,
        channel: &str,
        oldest: Option<&str>,
    ) -> Result<(Vec<InboundMessage>, Option<String>), ChatError> {
        let mut collected: Vec<SlackMessage> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("channel", channel), ("limit", HISTORY_LIMIT)];
            if let Some(oldest) = oldest {
                query.push(("oldest", oldest));
            }
            if let Some(ref cursor) = cursor {
                query.push(("cursor", cursor.as_str()));
            }

            let response = self
                .client
                .get(format!("{}/conversations.history", self.base_url))
                .bearer_auth(self.bot_token.expose_secret())
                .query(&query)
                .send()
                .await
                .map_err(|e| ChatError::Network(e.to_string()))?;

            let history: HistoryResponse = parse_response(response).await?;
            check_ok(history.ok, history.error)?;

            collected.extend(history.messages);

            let next = history
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.is_empty());
            match next {
                Some(next) if history.has_more => cursor = Some(next),
                _ => break,
            }
        }

        // Slack returns newest first, page by page
        let newest = collected.first().map(|m| m.ts.clone());
        let messages = collected
            .into_iter()
            .rev()
            .filter(|m| m.subtype.is_none() && m.bot_id.is_none())
            .filter_map(|m| m.text)
            .map(|text| InboundMessage::new(unescape(&text), channel))
            .collect::<Vec<_>>();

        if !messages.is_empty() {
            tracing::debug!(channel = %channel, count = messages.len(), "Fetched messages");
        }

        Ok((messages, newest))
    }
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn next_message(&self) -> Result<Option<InboundMessage>, ChatError> {
        let mut state = self.state.lock().await;

        loop {
            if let Some(message) = state.pending.pop_front() {
                return Ok(Some(message));
            }

            if state.polled {
                tokio::time::sleep(self.poll_interval).await;
            }
            state.polled = true;

            self.poll_channels(&mut state).await?;
        }
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), ChatError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&PostMessageRequest { channel, text })
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let result: ApiResponse = parse_response(response).await?;
        check_ok(result.ok, result.error)
    }
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct AuthTestResponse {
    ok: bool,
    error: Option<String>,
    user: Option<String>,
    team: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    has_more: bool,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct SlackMessage {
    ts: String,
    text: Option<String>,
    subtype: Option<String>,
    bot_id: Option<String>,
}

async fn parse_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ChatError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ChatError::Api("rate limited".to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api(format!("HTTP {}: {}", status.as_u16(), body)));
    }

    response
        .json()
        .await
        .map_err(|e| ChatError::Api(format!("Invalid response: {}", e)))
}

fn check_ok(ok: bool, error: Option<String>) -> Result<(), ChatError> {
    if ok {
        return Ok(());
    }

    let error = error.unwrap_or_else(|| "unknown_error".to_string());
    if AUTH_ERRORS.contains(&error.as_str()) {
        Err(ChatError::Auth(error))
    } else {
        Err(ChatError::Api(error))
    }
}

fn slack_ts(time: OffsetDateTime) -> String {
    format!("{}.{:06}", time.unix_timestamp(), time.microsecond())
}

/// Slack escapes these three characters in message text
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
