// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-sender workers.
//!
//! Each active sender owns one worker task fed by an unbounded queue, so a
//! sender's messages are routed strictly in arrival order, one turn at a time,
//! while different senders proceed in parallel. A worker retires after
//! `idle` without messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fieldops_core::types::InboundMessage;
use fieldops_core::MessagingTransport;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::router::Router;

struct WorkerHandle {
    id: u64,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

struct Shared {
    router: Arc<Router>,
    transport: Arc<dyn MessagingTransport>,
    workers: DashMap<String, WorkerHandle>,
    idle: Duration,
    cancel: CancellationToken,
}

pub struct Dispatcher {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        router: Arc<Router>,
        transport: Arc<dyn MessagingTransport>,
        idle: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                router,
                transport,
                workers: DashMap::new(),
                idle,
                cancel,
            }),
            next_id: AtomicU64::new(1),
            tracker: TaskTracker::new(),
        }
    }

    /// Queue `msg` on its sender's worker, starting one if needed.
    pub fn dispatch(&self, msg: InboundMessage) {
        let sender = msg.sender.clone();
        match self.shared.workers.entry(sender.clone()) {
            Entry::Occupied(mut entry) => {
                if let Err(mpsc::error::SendError(msg)) = entry.get().tx.send(msg) {
                    // The worker exited without deregistering (cancelled).
                    let handle = self.spawn_worker(sender, msg);
                    entry.insert(handle);
                }
            }
            Entry::Vacant(entry) => {
                let handle = self.spawn_worker(sender, msg);
                entry.insert(handle);
            }
        }
    }

    fn spawn_worker(&self, sender: String, first: InboundMessage) -> WorkerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        // Cannot fail: the receiver is alive until the task below drops it.
        let _ = tx.send(first);
        debug!(sender = %sender, worker = id, "worker started");
        self.tracker
            .spawn(run_worker(self.shared.clone(), id, sender, rx));
        WorkerHandle { id, tx }
    }

    /// Number of live workers.
    pub fn active_workers(&self) -> usize {
        self.shared.workers.len()
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    id: u64,
    sender: String,
    mut rx: mpsc::UnboundedReceiver<InboundMessage>,
) {
    loop {
        let next = tokio::select! {
            _ = shared.cancel.cancelled() => None,
            r = tokio::time::timeout(shared.idle, rx.recv()) => Some(r),
        };
        match next {
            None | Some(Ok(None)) => break,
            Some(Ok(Some(msg))) => handle(&shared, &msg).await,
            Some(Err(_elapsed)) => {
                // Retire only if nothing was queued while the timer fired.
                let retired = shared
                    .workers
                    .remove_if(&sender, |_, h| h.id == id && rx.is_empty())
                    .is_some();
                if retired {
                    break;
                }
            }
        }
    }
    debug!(sender = %sender, worker = id, "worker stopped");
}

async fn handle(shared: &Shared, msg: &InboundMessage) {
    let replies = shared.router.route(msg, Utc::now()).await;
    for reply in replies {
        if let Err(e) = shared.transport.send_text(&msg.sender, &reply).await {
            warn!(sender = %msg.sender, error = %e, "reply not delivered");
        }
    }
}
