// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ERP for dialog tests.
//!
//! Seed clients, contracts, open tickets and parts, then inspect what the
//! dialogs submitted. Failures can be scripted for lookups and for ticket
//! creation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use fieldops_core::erp::{
    Client, Contract, InterventionRef, NewIntervention, NewTicket, Part, TicketFilter, TicketRef,
    TicketSummary,
};
use fieldops_core::traits::adapter::PluginAdapter;
use fieldops_core::traits::erp::ErpClient;
use fieldops_core::types::{AdapterType, HealthStatus};
use fieldops_core::FieldopsError;

#[derive(Debug, Clone)]
struct OpenTicket {
    summary: TicketSummary,
    technician: Option<String>,
}

#[derive(Default)]
struct State {
    clients: HashMap<String, Client>,
    contracts: HashMap<String, Vec<Contract>>,
    open: Vec<OpenTicket>,
    parts: HashMap<String, Part>,
    created: Vec<NewTicket>,
    closed: Vec<(String, Option<String>)>,
    interventions: Vec<NewIntervention>,
    next_id: u64,
    fail_lookups: bool,
    lookup_delay: Duration,
    fail_create: Option<(u16, String)>,
}

#[derive(Default)]
pub struct MockErp {
    state: Mutex<State>,
}

fn unavailable() -> FieldopsError {
    FieldopsError::Erp {
        status: Some(503),
        message: "service unavailable".into(),
        body: None,
    }
}

impl MockErp {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_client(&self, code: &str, name: &str) {
        self.state.lock().await.clients.insert(
            code.to_string(),
            Client {
                code: code.to_string(),
                name: name.to_string(),
            },
        );
    }

    pub async fn add_contract(&self, client: &str, id: &str, description: &str, hours: Option<f64>) {
        self.state
            .lock()
            .await
            .contracts
            .entry(client.to_string())
            .or_default()
            .push(Contract {
                id: id.to_string(),
                description: description.to_string(),
                available_hours: hours,
            });
    }

    pub async fn add_open_ticket(&self, id: &str, client: &str, summary: &str, technician: Option<&str>) {
        self.state.lock().await.open.push(OpenTicket {
            summary: TicketSummary {
                id: id.to_string(),
                client_code: client.to_string(),
                summary: summary.to_string(),
                opened_at: None,
            },
            technician: technician.map(str::to_string),
        });
    }

    pub async fn add_part(&self, code: &str, description: &str) {
        self.state.lock().await.parts.insert(
            code.to_string(),
            Part {
                code: code.to_string(),
                description: description.to_string(),
            },
        );
    }

    /// Make every lookup fail with a 503.
    pub async fn fail_lookups(&self, fail: bool) {
        self.state.lock().await.fail_lookups = fail;
    }

    /// Delay every client lookup, to keep a turn in flight.
    pub async fn delay_lookups(&self, delay: Duration) {
        self.state.lock().await.lookup_delay = delay;
    }

    /// Make ticket creation answer `status` with `body`.
    pub async fn fail_ticket_creation(&self, status: u16, body: &str) {
        self.state.lock().await.fail_create = Some((status, body.to_string()));
    }

    pub async fn created_tickets(&self) -> Vec<NewTicket> {
        self.state.lock().await.created.clone()
    }

    pub async fn closed_tickets(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().await.closed.clone()
    }

    pub async fn interventions(&self) -> Vec<NewIntervention> {
        self.state.lock().await.interventions.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockErp {
    fn name(&self) -> &str {
        "mock-erp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Erp
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        Ok(())
    }
}

#[async_trait]
impl ErpClient for MockErp {
    async fn find_client(&self, code: &str) -> Result<Option<Client>, FieldopsError> {
        let delay = self.state.lock().await.lookup_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().await;
        if state.fail_lookups {
            return Err(unavailable());
        }
        Ok(state.clients.get(code).cloned())
    }

    async fn active_contracts(&self, client_code: &str) -> Result<Vec<Contract>, FieldopsError> {
        let state = self.state.lock().await;
        if state.fail_lookups {
            return Err(unavailable());
        }
        Ok(state.contracts.get(client_code).cloned().unwrap_or_default())
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> Result<TicketRef, FieldopsError> {
        let mut state = self.state.lock().await;
        if let Some((status, body)) = state.fail_create.clone() {
            return Err(FieldopsError::Erp {
                status: Some(status),
                message: format!("HTTP {status}"),
                body: Some(body),
            });
        }
        state.next_id += 1;
        let id = format!("{}", 1000 + state.next_id);
        state.created.push(ticket.clone());
        Ok(TicketRef { id })
    }

    async fn open_tickets(&self, filter: &TicketFilter) -> Result<Vec<TicketSummary>, FieldopsError> {
        let state = self.state.lock().await;
        if state.fail_lookups {
            return Err(unavailable());
        }
        Ok(state
            .open
            .iter()
            .filter(|t| match filter {
                TicketFilter::ByClient(code) => &t.summary.client_code == code,
                TicketFilter::ByTechnician(tech) => t.technician.as_deref() == Some(tech.as_str()),
            })
            .map(|t| t.summary.clone())
            .collect())
    }

    async fn close_ticket(&self, ticket_id: &str, closed_by: Option<&str>) -> Result<(), FieldopsError> {
        let mut state = self.state.lock().await;
        let before = state.open.len();
        state.open.retain(|t| t.summary.id != ticket_id);
        if state.open.len() == before {
            return Err(FieldopsError::Erp {
                status: Some(404),
                message: format!("ticket {ticket_id} not open"),
                body: None,
            });
        }
        state
            .closed
            .push((ticket_id.to_string(), closed_by.map(str::to_string)));
        Ok(())
    }

    async fn create_intervention(
        &self,
        intervention: &NewIntervention,
    ) -> Result<InterventionRef, FieldopsError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = format!("I{}", state.next_id);
        state.interventions.push(intervention.clone());
        Ok(InterventionRef { id })
    }

    async fn find_part(&self, code: &str) -> Result<Option<Part>, FieldopsError> {
        let state = self.state.lock().await;
        if state.fail_lookups {
            return Err(unavailable());
        }
        Ok(state.parts.get(code).cloned())
    }
}
