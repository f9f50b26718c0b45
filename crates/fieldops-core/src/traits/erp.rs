// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ERP/ticketing collaborator trait.

use async_trait::async_trait;

use crate::erp::{
    Client, Contract, InterventionRef, NewIntervention, NewTicket, Part, TicketFilter,
    TicketRef, TicketSummary,
};
use crate::error::FieldopsError;
use crate::traits::adapter::PluginAdapter;

/// Lookups and writes against the ERP. Every call may fail transiently and no
/// idempotency is assumed.
#[async_trait]
pub trait ErpClient: PluginAdapter {
    /// Looks up a client by code. `Ok(None)` when the ERP does not know it.
    async fn find_client(&self, code: &str) -> Result<Option<Client>, FieldopsError>;

    /// Lists the active contracts of a client.
    async fn active_contracts(&self, client_code: &str) -> Result<Vec<Contract>, FieldopsError>;

    /// Opens a ticket.
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<TicketRef, FieldopsError>;

    /// Lists open tickets matching `filter`.
    async fn open_tickets(&self, filter: &TicketFilter)
    -> Result<Vec<TicketSummary>, FieldopsError>;

    /// Closes a ticket.
    async fn close_ticket(
        &self,
        ticket_id: &str,
        closed_by: Option<&str>,
    ) -> Result<(), FieldopsError>;

    /// Records a technician intervention.
    async fn create_intervention(
        &self,
        intervention: &NewIntervention,
    ) -> Result<InterventionRef, FieldopsError>;

    /// Looks up a part in the catalog by scan code.
    async fn find_part(&self, code: &str) -> Result<Option<Part>, FieldopsError>;
}
