// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport backed by an HTTP bridge process.
//!
//! The bridge drives the messaging app session and exposes three routes:
//! `POST /send`, `GET /status` and `POST /restart`. Inbound messages arrive
//! the other way, posted by the bridge to the gateway's `/v1/inbound` webhook,
//! which forwards them through [`BridgeTransport::inbound_sender`].
//!
//! Send failures are classified for the outbox: network errors and 5xx/408/
//! 409/429 answers are retryable (the session may have dropped), other 4xx
//! answers are not.

pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use fieldops_config::model::BridgeConfig;
use fieldops_core::traits::{MessagingTransport, PluginAdapter};
use fieldops_core::types::{AdapterType, HealthStatus, InboundMessage};
use fieldops_core::FieldopsError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

pub use webhook::WebhookPayload;

/// Capacity of the inbound queue between the webhook and the dispatcher.
const INBOUND_CAPACITY: usize = 256;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

pub struct BridgeTransport {
    client: reqwest::Client,
    base_url: String,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS
        )
}

impl BridgeTransport {
    pub fn new(config: &BridgeConfig) -> Result<Self, FieldopsError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FieldopsError::Config(format!(
                "bridge.base_url must be an http(s) URL, got {:?}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                FieldopsError::Config(format!("invalid bridge.token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FieldopsError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                retryable: false,
                source: Some(Box::new(e)),
            })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        Ok(Self {
            client,
            base_url,
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
        })
    }

    /// Handle the webhook uses to feed inbound messages into [`receive`](MessagingTransport::receive).
    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn status(&self) -> Result<StatusResponse, FieldopsError> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FieldopsError::Transport {
                message: format!("bridge status answered {status}"),
                retryable: true,
                source: None,
            });
        }
        response.json().await.map_err(|e| FieldopsError::Transport {
            message: format!("unreadable bridge status: {e}"),
            retryable: true,
            source: Some(Box::new(e)),
        })
    }
}

fn network_error(e: reqwest::Error) -> FieldopsError {
    FieldopsError::Transport {
        message: format!("bridge unreachable: {e}"),
        retryable: true,
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for BridgeTransport {
    fn name(&self) -> &str {
        "http-bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        match self.status().await {
            Ok(s) if s.ready => Ok(HealthStatus::Healthy),
            Ok(s) => Ok(HealthStatus::Degraded(format!(
                "bridge session not ready (state: {})",
                s.state.as_deref().unwrap_or("unknown")
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        self.inbound_rx.lock().await.close();
        Ok(())
    }
}

#[async_trait]
impl MessagingTransport for BridgeTransport {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), FieldopsError> {
        let response = self
            .client
            .post(self.url("send"))
            .json(&SendRequest { to: recipient, text })
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            debug!(recipient, "bridge accepted message");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let retryable = is_retryable_status(status);
        warn!(recipient, status = status.as_u16(), retryable, "bridge rejected message");
        Err(FieldopsError::Transport {
            message: format!("bridge send answered {status}: {body}"),
            retryable,
            source: None,
        })
    }

    async fn receive(&self) -> Result<InboundMessage, FieldopsError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| FieldopsError::Transport {
            message: "bridge inbound channel closed".into(),
            retryable: false,
            source: None,
        })
    }

    async fn is_ready(&self) -> bool {
        match self.status().await {
            Ok(s) => s.ready,
            Err(e) => {
                debug!(error = %e, "bridge readiness check failed");
                false
            }
        }
    }

    async fn reconnect(&self) -> Result<(), FieldopsError> {
        let response = self
            .client
            .post(self.url("restart"))
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            info!("bridge session restart requested");
            Ok(())
        } else {
            Err(FieldopsError::Transport {
                message: format!("bridge restart answered {status}"),
                retryable: true,
                source: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::CONFLICT));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = BridgeConfig {
            base_url: "ws://localhost:3001".into(),
            ..BridgeConfig::default()
        };
        assert!(matches!(
            BridgeTransport::new(&config),
            Err(FieldopsError::Config(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = BridgeConfig {
            base_url: "http://localhost:3001/".into(),
            ..BridgeConfig::default()
        };
        let bridge = BridgeTransport::new(&config).unwrap();
        assert_eq!(bridge.url("send"), "http://localhost:3001/send");
    }
}
