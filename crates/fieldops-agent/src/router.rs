// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation router: decides what one inbound message means.
//!
//! Precedence, highest first:
//!
//! 1. a location for a pending punch;
//! 2. an ongoing intervention (the engine handles its own cancel);
//! 3. the cancel keyword;
//! 4. a flow keyword, when no session exists or the session sits at its first
//!    step or a confirmation (authorized before anything is replaced);
//! 5. the ongoing session;
//! 6. a pending punch that received text instead of a location;
//! 7. capability-scoped help.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fieldops_config::model::FieldopsConfig;
use fieldops_core::time::parse_timezone;
use fieldops_core::types::{Capability, Contact, InboundMessage};
use fieldops_core::{ContactStore, ErpClient, FieldopsError, PunchStore};
use tracing::{debug, info};

use crate::auth::{AuthorizationGate, DenialReason};
use crate::copy;
use crate::dialog::{
    Dialog, DialogKind, InterventionEngine, Next, PunchEngine, TicketCloseEngine,
    TicketCreateEngine, Turn, TurnContext,
};
use crate::keywords::Keywords;
use crate::location::extract_location;
use crate::session::{PendingInput, SessionStore};

/// Collaborators the router talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub contacts: Arc<dyn ContactStore>,
    pub punches: Arc<dyn PunchStore>,
    pub erp: Arc<dyn ErpClient>,
}

pub struct Router {
    gate: AuthorizationGate,
    sessions: Arc<SessionStore>,
    keywords: Arc<Keywords>,
    ticket_create: TicketCreateEngine,
    ticket_close: TicketCloseEngine,
    intervention: InterventionEngine,
    punch: PunchEngine,
    tz: Tz,
}

impl Router {
    pub fn new(
        config: &FieldopsConfig,
        deps: Collaborators,
        sessions: Arc<SessionStore>,
    ) -> Result<Self, FieldopsError> {
        let tz = parse_timezone(&config.agent.timezone)?;
        let keywords = Arc::new(Keywords::from_config(&config.keywords));
        Ok(Self {
            gate: AuthorizationGate::new(deps.contacts),
            sessions,
            ticket_create: TicketCreateEngine::new(deps.erp.clone(), keywords.clone()),
            ticket_close: TicketCloseEngine::new(deps.erp.clone(), keywords.clone()),
            intervention: InterventionEngine::new(deps.erp, keywords.clone()),
            punch: PunchEngine::new(deps.punches, keywords.clone(), config.punch.enforce_geofence),
            keywords,
            tz,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Process one inbound message at processing time `now` and return the
    /// replies for its sender.
    ///
    /// Sessions, pending inputs, punches and the business date all use `now`;
    /// `msg.received_at` is the sender-side timestamp and is only logged.
    pub async fn route(&self, msg: &InboundMessage, now: DateTime<Utc>) -> Vec<String> {
        let sender = msg.sender.as_str();
        let text = msg.text_or_empty();
        let ctx = TurnContext::new(now, self.tz);
        let lag = now - msg.received_at;
        if lag > chrono::Duration::minutes(1) {
            debug!(sender = %sender, lag_secs = lag.num_seconds(), "late delivery");
        }

        if let Some(at) = extract_location(msg) {
            if let Some(PendingInput::AwaitingLocation(target)) = self.sessions.pending(sender) {
                let outcome = self.punch.handle_location(&target, at, &ctx).await;
                if !outcome.keep_pending {
                    self.sessions.remove_pending(sender);
                }
                return outcome.replies;
            }
        }

        let session = self.sessions.get(sender);

        if let Some(s) = &session {
            if s.dialog.kind() == DialogKind::Intervention {
                return self.advance(sender, s.dialog.clone(), text, &ctx, now).await;
            }
        }

        if self.keywords.is_cancel(text) {
            if self.sessions.clear(sender) {
                info!(sender = %sender, "conversation cancelled by user");
                return vec![copy::CANCELLED.to_string()];
            }
            return self.help(sender, &ctx).await;
        }

        if let Some(kind) = self.keywords.detect(text) {
            let may_start = session.as_ref().is_none_or(|s| s.dialog.is_interruptible());
            if may_start {
                let current = session.as_ref().map(|s| &s.dialog);
                return self
                    .start(sender, kind, current, &ctx, now)
                    .await;
            }
            debug!(sender = %sender, %kind, "keyword ignored mid-flow");
        }

        if let Some(s) = session {
            return self.advance(sender, s.dialog, text, &ctx, now).await;
        }

        if self.sessions.pending(sender).is_some() {
            return vec![copy::LOCATION_REPROMPT.to_string()];
        }

        self.help(sender, &ctx).await
    }

    async fn start(
        &self,
        sender: &str,
        kind: DialogKind,
        current: Option<&Dialog>,
        ctx: &TurnContext,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let auth = self.gate.authorize(sender, kind.capability(), ctx.today).await;
        let Some(profile) = auth.profile.filter(|_| auth.authorized) else {
            let reason = auth.reason.unwrap_or(DenialReason::LookupFailed);
            info!(sender = %sender, %kind, %reason, "flow denied");
            return vec![copy::denial(reason).to_string()];
        };

        if let Some(old) = current {
            info!(
                sender = %sender,
                old_kind = %old.kind(),
                old_step = old.step_name(),
                new_kind = %kind,
                "session superseded"
            );
        }
        self.sessions.clear(sender);

        info!(sender = %sender, %kind, "session started");
        let turn = self.open(kind, &profile).await;
        self.apply(sender, turn, now)
    }

    async fn open(&self, kind: DialogKind, profile: &Contact) -> Turn<Dialog> {
        match kind {
            DialogKind::TicketCreate => self.ticket_create.start(profile).map(Dialog::TicketCreate),
            DialogKind::TicketClose => self.ticket_close.start(profile).map(Dialog::TicketClose),
            DialogKind::Intervention => self.intervention.start(profile).map(Dialog::Intervention),
            DialogKind::Punch => self.punch.start(profile).await.map(Dialog::Punch),
        }
    }

    async fn advance(
        &self,
        sender: &str,
        dialog: Dialog,
        text: &str,
        ctx: &TurnContext,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        debug!(sender = %sender, kind = %dialog.kind(), step = dialog.step_name(), "advancing session");
        let turn = match dialog {
            Dialog::TicketCreate(d) => self
                .ticket_create
                .advance(d, text, ctx)
                .await
                .map(Dialog::TicketCreate),
            Dialog::TicketClose(d) => self
                .ticket_close
                .advance(d, text, ctx)
                .await
                .map(Dialog::TicketClose),
            Dialog::Intervention(d) => self
                .intervention
                .advance(d, text, ctx)
                .await
                .map(Dialog::Intervention),
            Dialog::Punch(d) => self.punch.advance(d, text, ctx).await.map(Dialog::Punch),
        };
        self.apply(sender, turn, now)
    }

    fn apply(&self, sender: &str, turn: Turn<Dialog>, now: DateTime<Utc>) -> Vec<String> {
        let mut replies = turn.replies;
        match turn.next {
            Next::Continue(dialog) => self.sessions.put(sender, dialog, now),
            Next::Finished => {
                self.sessions.remove(sender);
                debug!(sender = %sender, "session finished");
            }
            Next::AwaitLocation(target) => {
                self.sessions.remove(sender);
                self.sessions
                    .set_pending(sender, PendingInput::AwaitingLocation(target), now);
            }
            Next::Abort => {
                self.sessions.clear(sender);
                info!(sender = %sender, "session aborted on inconsistent state");
                if replies.is_empty() {
                    replies.push(copy::RESTART.to_string());
                }
            }
        }
        replies
    }

    async fn help(&self, sender: &str, ctx: &TurnContext) -> Vec<String> {
        let caps = self.gate.capabilities(sender, ctx.today).await;
        let tickets = caps.contains(&Capability::CreateTickets);
        let punch = caps.contains(&Capability::RegisterPunch);
        match copy::help(tickets, punch) {
            Some(text) => vec![text],
            None => {
                debug!(sender = %sender, "no capabilities, staying silent");
                Vec::new()
            }
        }
    }
}
