// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ERP/ticketing collaborator over HTTP.
//!
//! [`HttpErpClient`] implements [`ErpClient`] against the ERP's JSON API:
//!
//! | operation | request |
//! |---|---|
//! | `find_client` | `GET /clientes/{codigo}` |
//! | `active_contracts` | `GET /clientes/{codigo}/contratos?status=ativo` |
//! | `create_ticket` | `POST /chamados` |
//! | `open_tickets` | `GET /chamados?status=aberto&cliente=..` or `&tecnico=..` |
//! | `close_ticket` | `POST /chamados/{id}/fechar` |
//! | `create_intervention` | `POST /intervencoes` |
//! | `find_part` | `GET /pecas/{codigo}` |
//!
//! A 404 on a lookup is `Ok(None)`. Everything else that is not 2xx becomes
//! [`FieldopsError::Erp`] with the status and a truncated body.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use fieldops_config::model::ErpConfig;
use fieldops_core::erp::{
    Client, Contract, InterventionRef, NewIntervention, NewTicket, Part, TicketFilter,
    TicketRef, TicketSummary,
};
use fieldops_core::traits::{ErpClient, PluginAdapter};
use fieldops_core::types::{AdapterType, HealthStatus};
use fieldops_core::FieldopsError;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ErpHttp, Lookup};

/// Body of `POST /chamados/{id}/fechar`.
#[derive(Debug, Serialize)]
struct CloseRequest<'a> {
    #[serde(rename = "fechadoPor", skip_serializing_if = "Option::is_none")]
    closed_by: Option<&'a str>,
}

pub struct HttpErpClient {
    http: ErpHttp,
}

impl HttpErpClient {
    pub fn new(config: &ErpConfig) -> Result<Self, FieldopsError> {
        let http = ErpHttp::new(
            &config.base_url,
            config.api_token.as_deref(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )?;
        info!(base_url = %http.base_url(), "erp client initialized");
        Ok(Self { http })
    }
}

/// Created-entity ids come back as strings or numbers depending on the ERP
/// build; accept both.
fn created_id(value: &Value, entity: &str) -> Result<String, FieldopsError> {
    match value.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(FieldopsError::Erp {
            status: None,
            message: format!("{entity} created but the response carried no id"),
            body: Some(value.to_string()),
        }),
    }
}

#[async_trait]
impl PluginAdapter for HttpErpClient {
    fn name(&self) -> &str {
        "http-erp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Erp
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        let url = self.http.url(&["health"], &[])?;
        match self.http.status_of(url).await {
            Ok(status) if status.is_success() => Ok(HealthStatus::Healthy),
            Ok(status) => Ok(HealthStatus::Degraded(format!("erp answered {status}"))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        Ok(())
    }
}

#[async_trait]
impl ErpClient for HttpErpClient {
    async fn find_client(&self, code: &str) -> Result<Option<Client>, FieldopsError> {
        let url = self.http.url(&["clientes", code], &[])?;
        match self.http.lookup::<Client>(url).await? {
            Lookup::Found(client) => Ok(Some(client)),
            Lookup::Missing => {
                debug!(code, "erp does not know the client");
                Ok(None)
            }
        }
    }

    async fn active_contracts(&self, client_code: &str) -> Result<Vec<Contract>, FieldopsError> {
        let url = self
            .http
            .url(&["clientes", client_code, "contratos"], &[("status", "ativo")])?;
        self.http.get(url).await
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> Result<TicketRef, FieldopsError> {
        let url = self.http.url(&["chamados"], &[])?;
        let response: Value = self.http.post(url, ticket).await?;
        let id = created_id(&response, "ticket")?;
        info!(ticket_id = %id, client = %ticket.client_code, "ticket created");
        Ok(TicketRef { id })
    }

    async fn open_tickets(
        &self,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketSummary>, FieldopsError> {
        let (key, value) = match filter {
            TicketFilter::ByClient(code) => ("cliente", code.as_str()),
            TicketFilter::ByTechnician(id) => ("tecnico", id.as_str()),
        };
        let url = self
            .http
            .url(&["chamados"], &[("status", "aberto"), (key, value)])?;
        self.http.get(url).await
    }

    async fn close_ticket(
        &self,
        ticket_id: &str,
        closed_by: Option<&str>,
    ) -> Result<(), FieldopsError> {
        let url = self.http.url(&["chamados", ticket_id, "fechar"], &[])?;
        self.http.post_unit(url, &CloseRequest { closed_by }).await?;
        info!(ticket_id, "ticket closed");
        Ok(())
    }

    async fn create_intervention(
        &self,
        intervention: &NewIntervention,
    ) -> Result<InterventionRef, FieldopsError> {
        let url = self.http.url(&["intervencoes"], &[])?;
        let response: Value = self.http.post(url, intervention).await?;
        let id = created_id(&response, "intervention")?;
        info!(intervention_id = %id, ticket_id = %intervention.ticket_id, "intervention recorded");
        Ok(InterventionRef { id })
    }

    async fn find_part(&self, code: &str) -> Result<Option<Part>, FieldopsError> {
        let url = self.http.url(&["pecas", code], &[])?;
        match self.http.lookup::<Part>(url).await? {
            Lookup::Found(part) => Ok(Some(part)),
            Lookup::Missing => Ok(None),
        }
    }
}
