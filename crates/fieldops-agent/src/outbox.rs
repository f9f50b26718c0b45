// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialized outbound path to the messaging transport.
//!
//! Every send, whether a dialog reply, a sweep notice or a scheduler
//! notification, goes through one writer task. Before sending, the writer
//! waits for transport readiness with a doubling backoff. A transient send
//! error triggers a reconnect (exponential, capped) and one retry.
//!
//! The writer is not tied to the shutdown token: it keeps draining until the
//! last [`Outbox`] handle is dropped, so replies produced while the agent loop
//! drains its workers still go out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldops_config::model::BridgeConfig;
use fieldops_core::types::{AdapterType, HealthStatus, InboundMessage};
use fieldops_core::{FieldopsError, MessagingTransport, PluginAdapter};
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const QUEUE_DEPTH: usize = 256;

/// Retry policy of the writer task.
#[derive(Debug, Clone, Copy)]
pub struct OutboxPolicy {
    pub ready_retries: u32,
    pub ready_backoff: Duration,
    pub reconnect_max_backoff: Duration,
}

impl From<&BridgeConfig> for OutboxPolicy {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            ready_retries: config.ready_retries,
            ready_backoff: Duration::from_millis(config.ready_backoff_ms),
            reconnect_max_backoff: Duration::from_secs(config.reconnect_max_backoff_secs),
        }
    }
}

impl Default for OutboxPolicy {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

struct SendCommand {
    recipient: String,
    text: String,
    done: oneshot::Sender<Result<(), FieldopsError>>,
}

/// A [`MessagingTransport`] that funnels sends through a single writer task.
pub struct Outbox {
    inner: Arc<dyn MessagingTransport>,
    tx: mpsc::Sender<SendCommand>,
}

impl Outbox {
    /// Spawn the writer task on `tracker`. It stops once every handle is
    /// dropped and the queue is empty.
    pub fn spawn(
        inner: Arc<dyn MessagingTransport>,
        policy: OutboxPolicy,
        tracker: &TaskTracker,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<SendCommand>(QUEUE_DEPTH);
        let writer = inner.clone();
        tracker.spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let result = deliver(writer.as_ref(), &policy, &cmd.recipient, &cmd.text).await;
                if let Err(e) = &result {
                    warn!(recipient = %cmd.recipient, error = %e, "outbound message not delivered");
                }
                let _ = cmd.done.send(result);
            }
            debug!("outbox writer stopped");
        });
        Self { inner, tx }
    }
}

async fn wait_ready(transport: &dyn MessagingTransport, policy: &OutboxPolicy) -> bool {
    let mut delay = policy.ready_backoff;
    for attempt in 0..=policy.ready_retries {
        if transport.is_ready().await {
            return true;
        }
        if attempt < policy.ready_retries {
            debug!(attempt, delay_ms = delay.as_millis() as u64, "transport not ready, waiting");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }
    false
}

async fn reconnect(transport: &dyn MessagingTransport, policy: &OutboxPolicy) -> Result<(), FieldopsError> {
    let mut delay = policy.ready_backoff;
    let attempts = policy.ready_retries.max(1);
    let mut last = FieldopsError::TransportNotReady;
    for attempt in 1..=attempts {
        match transport.reconnect().await {
            Ok(()) => {
                info!(attempt, "transport reconnected");
                return Ok(());
            }
            Err(e) => {
                warn!(attempt, error = %e, "transport reconnect failed");
                last = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2).min(policy.reconnect_max_backoff);
        }
    }
    Err(last)
}

async fn deliver(
    transport: &dyn MessagingTransport,
    policy: &OutboxPolicy,
    recipient: &str,
    text: &str,
) -> Result<(), FieldopsError> {
    if !wait_ready(transport, policy).await {
        return Err(FieldopsError::TransportNotReady);
    }
    match transport.send_text(recipient, text).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_transient() => {
            warn!(recipient = %recipient, error = %e, "transient send failure, reconnecting");
            reconnect(transport, policy).await?;
            transport.send_text(recipient, text).await
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl PluginAdapter for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        if self.tx.is_closed() {
            return Ok(HealthStatus::Unhealthy("outbox writer stopped".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MessagingTransport for Outbox {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), FieldopsError> {
        let (done, result) = oneshot::channel();
        let cmd = SendCommand {
            recipient: recipient.to_string(),
            text: text.to_string(),
            done,
        };
        self.tx
            .send(cmd)
            .await
            .map_err(|_| FieldopsError::Internal("outbox writer stopped".into()))?;
        result
            .await
            .map_err(|_| FieldopsError::Internal("outbox writer dropped the send".into()))?
    }

    async fn receive(&self) -> Result<InboundMessage, FieldopsError> {
        self.inner.receive().await
    }

    async fn is_ready(&self) -> bool {
        self.inner.is_ready().await
    }

    async fn reconnect(&self) -> Result<(), FieldopsError> {
        self.inner.reconnect().await
    }
}
