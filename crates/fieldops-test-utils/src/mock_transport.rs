// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging transport for deterministic testing.
//!
//! `MockTransport` implements `MessagingTransport` with injectable inbound
//! messages, captured outbound messages, a controllable readiness flag,
//! scripted send failures and an optional per-send latency.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use fieldops_core::traits::adapter::PluginAdapter;
use fieldops_core::traits::transport::MessagingTransport;
use fieldops_core::types::{AdapterType, HealthStatus, InboundMessage, OutboundMessage};
use fieldops_core::FieldopsError;

/// A mock messaging transport for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send_text()` are captured and retrievable via `sent_messages()`
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    sent_notify: Arc<Notify>,
    ready: AtomicBool,
    /// `is_ready()` answers false this many more times before following `ready`.
    not_ready_polls: AtomicU32,
    ready_polls: AtomicU32,
    /// `true` entries fail as retryable, `false` as fatal.
    send_failures: Mutex<VecDeque<bool>>,
    reconnects: AtomicU32,
    send_latency_ms: AtomicU64,
}

impl MockTransport {
    /// Create a new mock transport that is ready and never fails.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            sent_notify: Arc::new(Notify::new()),
            ready: AtomicBool::new(true),
            not_ready_polls: AtomicU32::new(0),
            ready_polls: AtomicU32::new(0),
            send_failures: Mutex::new(VecDeque::new()),
            reconnects: AtomicU32::new(0),
            send_latency_ms: AtomicU64::new(0),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Get all messages that were sent through `send_text()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to one recipient, in order.
    pub async fn sent_to(&self, recipient: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.recipient == recipient)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Wait until at least `count` messages were sent, or `timeout` elapses.
    /// Returns whether the count was reached.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.sent_notify.notified();
                if self.sent_count().await >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Report not-ready for the next `polls` readiness checks.
    pub fn not_ready_for(&self, polls: u32) {
        self.not_ready_polls.store(polls, Ordering::SeqCst);
    }

    /// Number of `is_ready()` calls so far.
    pub fn ready_polls(&self) -> u32 {
        self.ready_polls.load(Ordering::SeqCst)
    }

    /// Fail the next send; `retryable` selects a transient or fatal error.
    pub async fn fail_next_send(&self, retryable: bool) {
        self.send_failures.lock().await.push_back(retryable);
    }

    /// Make every `send_text` take at least `latency`.
    pub fn set_send_latency(&self, latency: Duration) {
        self.send_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingTransport for MockTransport {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), FieldopsError> {
        let latency = self.send_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if let Some(retryable) = self.send_failures.lock().await.pop_front() {
            return Err(FieldopsError::Transport {
                message: "scripted failure".into(),
                retryable,
                source: None,
            });
        }
        self.sent.lock().await.push(OutboundMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        });
        self.sent_notify.notify_waiters();
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, FieldopsError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            // Wait for notification that a new message was injected
            self.notify.notified().await;
        }
    }

    async fn is_ready(&self) -> bool {
        self.ready_polls.fetch_add(1, Ordering::SeqCst);
        let pending = self.not_ready_polls.load(Ordering::SeqCst);
        if pending > 0 {
            self.not_ready_polls.store(pending - 1, Ordering::SeqCst);
            return false;
        }
        self.ready.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<(), FieldopsError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
