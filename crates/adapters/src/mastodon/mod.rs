//! Mastodon API adapter for publishing statuses

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tootbridge_domain::{PublishError, PublishResult, StatusBody, StatusPublisher};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Mastodon publisher posting to `/api/v1/statuses`
pub struct MastodonPublisher {
    client: Client,
    access_token: SecretString,
    base_url: String,
}

impl MastodonPublisher {
    pub fn new(access_token: SecretString, host: &str) -> Result<Self, PublishError> {
        Self::with_timeout(access_token, host, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        access_token: SecretString,
        host: &str,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            access_token,
            base_url: normalize_host(host),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Accepts `mastodon.social`, `https://mastodon.social` or `https://mastodon.social/`
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl StatusPublisher for MastodonPublisher {
    async fn publish(&self, body: &StatusBody) -> Result<PublishResult, PublishError> {
        let url = format!("{}/api/v1/statuses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.access_token.expose_secret()),
            )
            .form(&[("status", body.as_str())])
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PublishError::Auth("Invalid access token".to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PublishError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // The status exists at this point; an unexpected body must not make
        // the caller think the publish failed.
        match response.json::<StatusResponse>().await {
            Ok(created) => Ok(PublishResult {
                id: created.id,
                url: created.url,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Unexpected status response body");
                Ok(PublishResult {
                    id: "unknown".to_string(),
                    url: None,
                })
            }
        }
    }

    fn platform(&self) -> &'static str {
        "mastodon"
    }
}
