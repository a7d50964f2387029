//! Notice delivery over HTTP

use crate::payload::Notice;
use async_trait::async_trait;
use honeybadger_core::DispatchConfig;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to serialize notice: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else {
            TransportError::Http(err)
        }
    }
}

/// Result of a single delivery attempt
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub transport_error: Option<TransportError>,
}

impl DeliveryOutcome {
    /// Only `201 Created` counts as delivered
    pub fn from_status(status: u16) -> Self {
        Self {
            succeeded: status == StatusCode::CREATED.as_u16(),
            status_code: Some(status),
            transport_error: None,
        }
    }

    pub fn from_error(error: TransportError) -> Self {
        Self {
            succeeded: false,
            status_code: None,
            transport_error: Some(error),
        }
    }

    /// Short reason for log lines
    pub fn describe(&self) -> String {
        match (&self.transport_error, self.status_code) {
            (Some(err), _) => err.to_string(),
            (None, Some(status)) => format!("status code {}", status),
            (None, None) => "no response".to_string(),
        }
    }
}

/// Sends one serialized notice. Implementations never panic on network failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, notice: &Notice) -> DeliveryOutcome;
}

pub struct HttpTransport {
    http_client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &DispatchConfig) -> Result<Self, TransportError> {
        // Workers each drive their own runtime, so idle connections must not be pooled
        // across them.
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .user_agent(concat!("honeybadger-rust/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, notice: &Notice) -> DeliveryOutcome {
        let payload = match serde_json::to_vec(notice) {
            Ok(payload) => payload,
            Err(e) => return DeliveryOutcome::from_error(e.into()),
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .body(payload)
            .send()
            .await;

        match response {
            Ok(resp) => DeliveryOutcome::from_status(resp.status().as_u16()),
            Err(e) => DeliveryOutcome::from_error(e.into()),
        }
    }
}
