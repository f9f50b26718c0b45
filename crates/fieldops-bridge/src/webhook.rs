// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook payload posted by the bridge.

use chrono::{DateTime, Utc};
use fieldops_core::types::{Coordinate, InboundMessage, MediaBlob};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMedia {
    pub mimetype: String,
    /// Base64 payload.
    pub data: String,
}

/// One message event as the bridge reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "fromMe", default)]
    pub from_me: bool,
    #[serde(default)]
    pub location: Option<WebhookLocation>,
    #[serde(default)]
    pub media: Option<WebhookMedia>,
    /// Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl WebhookPayload {
    /// Our own echoes, group chats and status broadcasts never reach the bot.
    pub fn is_relevant(&self) -> bool {
        !self.from_me
            && !self.from.is_empty()
            && !self.from.ends_with("@g.us")
            && !self.from.ends_with("@broadcast")
    }

    /// Converts to an [`InboundMessage`], or `None` for events the bot ignores.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        if !self.is_relevant() {
            return None;
        }
        let location = self
            .location
            .map(|l| Coordinate::new(l.latitude, l.longitude));
        let text = self.body.filter(|b| !b.trim().is_empty());
        let media = self.media.map(|m| MediaBlob {
            mime_type: m.mimetype,
            data: m.data,
        });
        if text.is_none() && location.is_none() && media.is_none() {
            return None;
        }
        let received_at = self
            .timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);
        Some(InboundMessage {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            sender: self.from,
            // A location share may carry a caption; the coordinates win.
            text: if location.is_some() { None } else { text },
            location,
            media,
            received_at,
        })
    }
}
