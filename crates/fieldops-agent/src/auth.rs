// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization gate: who may start which flow.
//!
//! The gate never returns an error. A failed directory lookup is logged and
//! treated as a denial.

use std::sync::Arc;

use chrono::NaiveDate;
use fieldops_core::address::find_contact;
use fieldops_core::types::{Capability, Contact};
use fieldops_core::ContactStore;
use strum::Display;
use tracing::{debug, warn};

/// Why a sender was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DenialReason {
    UnknownSender,
    MissingCapability,
    NotYetValid,
    Expired,
    LookupFailed,
}

/// Result of [`AuthorizationGate::authorize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    pub authorized: bool,
    /// The resolved contact, present when authorized.
    pub profile: Option<Contact>,
    pub reason: Option<DenialReason>,
}

impl Authorization {
    fn granted(profile: Contact) -> Self {
        Self {
            authorized: true,
            profile: Some(profile),
            reason: None,
        }
    }

    fn denied(reason: DenialReason) -> Self {
        Self {
            authorized: false,
            profile: None,
            reason: Some(reason),
        }
    }
}

/// Whether `contact` holds `capability`, including the linked ids it needs.
pub fn holds(contact: &Contact, capability: Capability) -> bool {
    match capability {
        Capability::CreateTickets => contact.can_create_tickets,
        Capability::CloseTickets | Capability::LogInterventions => {
            contact.can_create_tickets && contact.technician_id.is_some()
        }
        Capability::RegisterPunch => {
            contact.can_register_punch && contact.user_id.is_some() && !contact.site_ids.is_empty()
        }
    }
}

/// Check the validity window against the business-local date.
pub fn check_window(contact: &Contact, today: NaiveDate) -> Result<(), DenialReason> {
    if contact.valid_from.is_some_and(|from| today < from) {
        return Err(DenialReason::NotYetValid);
    }
    if contact.valid_until.is_some_and(|until| today > until) {
        return Err(DenialReason::Expired);
    }
    Ok(())
}

pub struct AuthorizationGate {
    contacts: Arc<dyn ContactStore>,
}

impl AuthorizationGate {
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }

    async fn lookup(&self, address: &str) -> Result<Option<Contact>, DenialReason> {
        match self.contacts.list_contacts().await {
            Ok(contacts) => Ok(find_contact(&contacts, address).cloned()),
            Err(e) => {
                warn!(sender = %address, error = %e, "contact lookup failed, denying");
                Err(DenialReason::LookupFailed)
            }
        }
    }

    pub async fn authorize(
        &self,
        address: &str,
        capability: Capability,
        today: NaiveDate,
    ) -> Authorization {
        let contact = match self.lookup(address).await {
            Ok(Some(c)) => c,
            Ok(None) => return Authorization::denied(DenialReason::UnknownSender),
            Err(reason) => return Authorization::denied(reason),
        };
        if !holds(&contact, capability) {
            debug!(sender = %address, %capability, "capability not held");
            return Authorization::denied(DenialReason::MissingCapability);
        }
        if let Err(reason) = check_window(&contact, today) {
            debug!(sender = %address, %reason, "outside validity window");
            return Authorization::denied(reason);
        }
        Authorization::granted(contact)
    }

    /// Capabilities the sender currently holds; empty when unknown or outside
    /// the validity window.
    pub async fn capabilities(&self, address: &str, today: NaiveDate) -> Vec<Capability> {
        let Ok(Some(contact)) = self.lookup(address).await else {
            return Vec::new();
        };
        if check_window(&contact, today).is_err() {
            return Vec::new();
        }
        [
            Capability::CreateTickets,
            Capability::CloseTickets,
            Capability::LogInterventions,
            Capability::RegisterPunch,
        ]
        .into_iter()
        .filter(|cap| holds(&contact, *cap))
        .collect()
    }
}
