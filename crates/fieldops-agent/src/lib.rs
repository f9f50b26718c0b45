// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Fieldops bot.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages from the messaging transport
//! - Hands them to per-sender workers that run the [`Router`]
//! - Sends the replies back through the serialized [`Outbox`]
//! - Drains in-flight turns on shutdown

pub mod auth;
pub mod copy;
pub mod dialog;
pub mod dispatcher;
pub mod keywords;
pub mod location;
pub mod outbox;
pub mod punch_direction;
pub mod router;
pub mod session;
pub mod shutdown;
pub mod sweep;

use std::sync::Arc;
use std::time::Duration;

use fieldops_core::error::FieldopsError;
use fieldops_core::MessagingTransport;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use auth::{AuthorizationGate, Authorization, DenialReason};
pub use dispatcher::Dispatcher;
pub use outbox::{Outbox, OutboxPolicy};
pub use router::{Collaborators, Router};
pub use session::{PendingInput, Session, SessionStore};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// The main loop between the transport and the router.
pub struct AgentLoop {
    transport: Arc<dyn MessagingTransport>,
    dispatcher: Dispatcher,
}

impl AgentLoop {
    /// `transport` is used for both receiving and replying; pass an [`Outbox`]
    /// so replies are serialized with every other send.
    pub fn new(
        router: Arc<Router>,
        transport: Arc<dyn MessagingTransport>,
        idle_worker: Duration,
        cancel: CancellationToken,
    ) -> Self {
        info!("agent loop initialized");
        let dispatcher = Dispatcher::new(router, transport.clone(), idle_worker, cancel);
        Self {
            transport,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs until `cancel` fires or the transport's inbound stream closes.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), FieldopsError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                msg = self.transport.receive() => {
                    match msg {
                        Ok(inbound) => self.dispatcher.dispatch(inbound),
                        Err(e) if e.is_transient() => {
                            warn!(error = %e, "transport receive failed, retrying");
                            tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                        }
                        Err(e) => {
                            error!(error = %e, "transport receive error, stopping agent loop");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        shutdown::drain_workers(self.dispatcher.tracker(), DRAIN_TIMEOUT).await;
        info!("agent loop stopped");
        Ok(())
    }
}
