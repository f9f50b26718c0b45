// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types exchanged with the ERP/ticketing collaborator.
//!
//! Field names follow the ERP's JSON contract, which is in Portuguese.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A customer known to the ERP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
}

/// A service contract of a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "horasDisponiveis", default)]
    pub available_hours: Option<f64>,
}

/// Ticket creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    #[serde(rename = "cliente")]
    pub client_code: String,
    #[serde(rename = "contratoID")]
    pub contract_id: Option<String>,
    #[serde(rename = "prioridade")]
    pub priority: String,
    #[serde(rename = "descricaoProblema")]
    pub problem: String,
    #[serde(rename = "solicitante", skip_serializing_if = "Option::is_none", default)]
    pub requester: Option<String>,
}

/// Identifier of a created ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: String,
}

/// A row of the open-ticket listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    #[serde(rename = "cliente", default)]
    pub client_code: String,
    #[serde(rename = "descricao", default)]
    pub summary: String,
    #[serde(rename = "abertura", default)]
    pub opened_at: Option<String>,
}

/// Which open tickets to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketFilter {
    ByClient(String),
    ByTechnician(String),
}

/// State of the ticket after an intervention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
pub enum InterventionOutcome {
    #[serde(rename = "em_andamento")]
    #[strum(serialize = "em_andamento")]
    InProgress,
    #[serde(rename = "resolvido")]
    #[strum(serialize = "resolvido")]
    Resolved,
    #[serde(rename = "aguardando_pecas")]
    #[strum(serialize = "aguardando_pecas")]
    AwaitingParts,
}

/// Where the intervention happened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
pub enum ServiceMode {
    #[serde(rename = "remoto")]
    #[strum(serialize = "remoto")]
    Remote,
    #[serde(rename = "presencial")]
    #[strum(serialize = "presencial")]
    Onsite,
}

/// A catalog part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
}

/// A part consumed during an intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartUsage {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "quantidade")]
    pub quantity: f64,
}

/// Intervention creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIntervention {
    #[serde(rename = "chamadoID")]
    pub ticket_id: String,
    #[serde(rename = "tecnicoID")]
    pub technician_id: Option<String>,
    #[serde(rename = "estado")]
    pub outcome: InterventionOutcome,
    #[serde(rename = "modalidade")]
    pub mode: ServiceMode,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "pecas")]
    pub parts: Vec<PartUsage>,
    #[serde(rename = "inicio")]
    pub started_at: NaiveDateTime,
    #[serde(rename = "fim")]
    pub ended_at: NaiveDateTime,
}

/// Identifier of a created intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionRef {
    pub id: String,
}
