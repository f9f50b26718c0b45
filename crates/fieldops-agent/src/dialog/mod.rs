// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog engines and their common turn contract.
//!
//! Every engine exposes `start(profile) -> Turn` and
//! `advance(dialog, input, ctx) -> Turn`. The dialog value is a typed state
//! machine: one enum per kind whose variants are the steps, next to the draft
//! accumulated so far.

pub mod input;
pub mod intervention;
pub mod punch;
pub mod ticket_close;
pub mod ticket_create;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fieldops_core::types::{Capability, WorkSite};
use serde::Serialize;
use strum::{Display, EnumString};

pub use intervention::{InterventionDialog, InterventionEngine};
pub use punch::{PunchDialog, PunchEngine};
pub use ticket_close::{TicketCloseDialog, TicketCloseEngine};
pub use ticket_create::{TicketCreateDialog, TicketCreateEngine};

/// The four conversational flows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    TicketCreate,
    TicketClose,
    Intervention,
    Punch,
}

impl DialogKind {
    /// Capability a sender needs to start this flow.
    pub fn capability(&self) -> Capability {
        match self {
            DialogKind::TicketCreate => Capability::CreateTickets,
            DialogKind::TicketClose => Capability::CloseTickets,
            DialogKind::Intervention => Capability::LogInterventions,
            DialogKind::Punch => Capability::RegisterPunch,
        }
    }
}

/// Where a punch will be recorded once the user's location arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct PunchTarget {
    pub user_id: i64,
    pub site: WorkSite,
}

/// What happens to the session after a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Next<D> {
    Continue(D),
    Finished,
    /// Session ends and a pending location request is created.
    AwaitLocation(PunchTarget),
    /// Inconsistent state: drop everything and ask the user to restart.
    Abort,
}

/// Replies to send plus the session transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn<D> {
    pub replies: Vec<String>,
    pub next: Next<D>,
}

impl<D> Turn<D> {
    pub fn reply(text: impl Into<String>, next: Next<D>) -> Self {
        Self {
            replies: vec![text.into()],
            next,
        }
    }

    pub fn stay(dialog: D, text: impl Into<String>) -> Self {
        Self::reply(text, Next::Continue(dialog))
    }

    pub fn finish(text: impl Into<String>) -> Self {
        Self::reply(text, Next::Finished)
    }

    pub fn map<E>(self, f: impl FnOnce(D) -> E) -> Turn<E> {
        let next = match self.next {
            Next::Continue(d) => Next::Continue(f(d)),
            Next::Finished => Next::Finished,
            Next::AwaitLocation(t) => Next::AwaitLocation(t),
            Next::Abort => Next::Abort,
        };
        Turn {
            replies: self.replies,
            next,
        }
    }
}

/// Clock values for one turn, already in the business timezone.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub now: DateTime<Tz>,
    pub today: NaiveDate,
}

impl TurnContext {
    pub fn new(instant: DateTime<Utc>, tz: Tz) -> Self {
        let now = instant.with_timezone(&tz);
        Self {
            now,
            today: now.date_naive(),
        }
    }
}

/// An active dialog of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    TicketCreate(TicketCreateDialog),
    TicketClose(TicketCloseDialog),
    Intervention(InterventionDialog),
    Punch(PunchDialog),
}

impl Dialog {
    pub fn kind(&self) -> DialogKind {
        match self {
            Dialog::TicketCreate(_) => DialogKind::TicketCreate,
            Dialog::TicketClose(_) => DialogKind::TicketClose,
            Dialog::Intervention(_) => DialogKind::Intervention,
            Dialog::Punch(_) => DialogKind::Punch,
        }
    }

    /// Name of the current step, for logs and the admin surface.
    pub fn step_name(&self) -> &'static str {
        match self {
            Dialog::TicketCreate(d) => d.step_name(),
            Dialog::TicketClose(d) => d.step_name(),
            Dialog::Intervention(d) => d.step_name(),
            Dialog::Punch(d) => d.step_name(),
        }
    }

    /// A keyword may supersede the dialog only at its first step or while it
    /// waits for a confirmation.
    pub fn is_interruptible(&self) -> bool {
        match self {
            Dialog::TicketCreate(d) => d.is_initial() || d.is_confirmation(),
            Dialog::TicketClose(d) => d.is_initial() || d.is_confirmation(),
            Dialog::Intervention(d) => d.is_initial() || d.is_confirmation(),
            Dialog::Punch(_) => true,
        }
    }
}
