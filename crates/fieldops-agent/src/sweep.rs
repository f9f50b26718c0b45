// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic eviction of idle sessions and pending inputs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fieldops_core::MessagingTransport;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::copy;
use crate::session::SessionStore;

/// Evict expired entries as of `now` and tell each affected sender.
/// Notification failures are logged and ignored. Returns the eviction count.
pub async fn sweep_once(
    sessions: &SessionStore,
    transport: &dyn MessagingTransport,
    now: DateTime<Utc>,
) -> usize {
    let evicted = sessions.sweep_expired(now);
    for sender in &evicted {
        if let Err(e) = transport.send_text(sender, copy::SESSION_EXPIRED).await {
            debug!(sender = %sender, error = %e, "expiry notice not delivered");
        }
    }
    if !evicted.is_empty() {
        info!(count = evicted.len(), "idle sessions evicted");
    }
    evicted.len()
}

/// Run [`sweep_once`] every `interval` until `cancel` fires.
pub async fn run_sweeper(
    sessions: Arc<SessionStore>,
    transport: Arc<dyn MessagingTransport>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(interval_secs = interval.as_secs(), "session sweeper started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                sweep_once(&sessions, transport.as_ref(), Utc::now()).await;
            }
        }
    }
    debug!("session sweeper stopped");
}
