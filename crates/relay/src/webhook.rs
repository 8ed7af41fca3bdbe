//! Webhook delivery client

use async_trait::async_trait;
use camwatch_core::config::WebhookConfig;
use camwatch_core::{Detection, Notification, Sink};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delivery failures
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: Url,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status} after {attempts} attempt(s)")]
    Status {
        url: Url,
        status: StatusCode,
        attempts: u32,
    },
}

/// What happened to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered with a 2xx status
    Delivered { status: StatusCode, attempts: u32 },
    /// No endpoint configured
    Skipped,
}

/// Transport and retry settings
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts (1 = fire and forget)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further one
    pub backoff: Duration,
    /// Skip TLS certificate validation
    pub accept_invalid_certs: bool,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            backoff: Duration::from_millis(500),
            accept_invalid_certs: false,
        }
    }
}

impl DeliveryPolicy {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }
}

/// POSTs notifications as JSON to a webhook endpoint
pub struct WebhookClient {
    http: Client,
    endpoint: Option<Url>,
    policy: DeliveryPolicy,
}

impl WebhookClient {
    /// Build a client; an absent or blank endpoint disables delivery
    pub fn new(endpoint: Option<&str>, policy: DeliveryPolicy) -> Result<Self, DeliveryError> {
        let endpoint = match endpoint.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => Some(Url::parse(url).map_err(|e| DeliveryError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        if policy.accept_invalid_certs && endpoint.is_some() {
            warn!("TLS certificate validation is disabled for webhook delivery");
        }

        let http = Client::builder()
            .danger_accept_invalid_certs(policy.accept_invalid_certs)
            .timeout(policy.timeout)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            http,
            endpoint,
            policy,
        })
    }

    pub fn from_config(endpoint: Option<&str>, config: &WebhookConfig) -> Result<Self, DeliveryError> {
        Self::new(endpoint, DeliveryPolicy::from_config(config))
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Send `notification`, retrying per policy
    pub async fn deliver(&self, notification: &Notification) -> Result<DeliveryOutcome, DeliveryError> {
        let url = match &self.endpoint {
            Some(url) => url,
            None => return Ok(DeliveryOutcome::Skipped),
        };

        let body = notification.to_json()?;
        let mut attempt = 1;

        loop {
            let result = self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;

            let error = match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(DeliveryOutcome::Delivered {
                        status: response.status(),
                        attempts: attempt,
                    })
                }
                Ok(response) => DeliveryError::Status {
                    url: url.clone(),
                    status: response.status(),
                    attempts: attempt,
                },
                Err(source) => DeliveryError::Transport {
                    url: url.clone(),
                    attempts: attempt,
                    source,
                },
            };

            if attempt >= self.policy.max_attempts {
                return Err(error);
            }

            let delay = self.policy.backoff_after(attempt);
            warn!("Webhook attempt {} failed ({}), retrying in {:?}", attempt, error, delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Sink that delivers every detection to the webhook
pub struct WebhookSink {
    client: Arc<WebhookClient>,
}

impl WebhookSink {
    pub fn new(client: Arc<WebhookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn publish(&self, detection: &Detection) -> anyhow::Result<()> {
        match self.client.deliver(&detection.notification).await? {
            DeliveryOutcome::Delivered { status, attempts } => {
                info!(
                    "Sent webhook for {} {} ({}, {} attempt(s))",
                    detection.kind,
                    detection.path.display(),
                    status,
                    attempts
                );
            }
            DeliveryOutcome::Skipped => {
                debug!("No webhook configured, skipping {}", detection.path.display());
            }
        }
        Ok(())
    }
}
