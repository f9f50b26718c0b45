// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait (the end-user's text messaging app).

use async_trait::async_trait;

use crate::error::FieldopsError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InboundMessage;

/// Bidirectional text messaging with end users.
///
/// Implementations are not assumed to be safe for concurrent sends; callers go
/// through the serialized outbox.
#[async_trait]
pub trait MessagingTransport: PluginAdapter {
    /// Sends a text message to `recipient`.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), FieldopsError>;

    /// Receives the next inbound message.
    async fn receive(&self) -> Result<InboundMessage, FieldopsError>;

    /// Whether the transport can currently deliver messages.
    async fn is_ready(&self) -> bool;

    /// Re-establishes the underlying session after a connection loss.
    async fn reconnect(&self) -> Result<(), FieldopsError>;
}
