// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the admin API and the bridge webhook.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use fieldops_agent::session::SessionInfo;
use fieldops_bridge::WebhookPayload;
use fieldops_core::job::{JobDefinition, JobSpec};
use fieldops_core::types::{ContactEntry, ContactList, HealthStatus};
use fieldops_core::FieldopsError;
use fieldops_cron::{Dispatch, LogEntry};
use serde::{Deserialize, Serialize};

use crate::error::{error_response, ApiError};
use crate::server::GatewayState;

const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct AdapterHealth {
    pub name: String,
    pub status: HealthStatus,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every adapter is healthy, `degraded` otherwise.
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
    pub adapters: Vec<AdapterHealth>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub job_id: i64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let mut adapters = Vec::with_capacity(state.adapters.len());
    for adapter in &state.adapters {
        let status = adapter
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
        adapters.push(AdapterHealth {
            name: adapter.name().to_string(),
            status,
        });
    }
    let all_healthy = adapters.iter().all(|a| a.status == HealthStatus::Healthy);
    Json(HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        adapters,
    })
}

// --- jobs ---

pub async fn list_jobs(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<JobDefinition>>, ApiError> {
    Ok(Json(state.jobs.list_jobs().await?))
}

pub async fn get_job(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<JobDefinition>, ApiError> {
    state
        .jobs
        .get_job(id)
        .await?
        .map(Json)
        .ok_or_else(|| job_not_found(id))
}

pub async fn create_job(
    State(state): State<GatewayState>,
    Json(spec): Json<JobSpec>,
) -> Result<(StatusCode, Json<JobDefinition>), ApiError> {
    spec.validate()?;
    let job = state.jobs.create_job(&spec).await?;
    tracing::info!(job_id = job.id, name = %job.spec.name, kind = %job.spec.kind, "job created");
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn update_job(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(spec): Json<JobSpec>,
) -> Result<Json<JobDefinition>, ApiError> {
    spec.validate()?;
    let job = state.jobs.update_job(id, &spec).await?;
    tracing::info!(job_id = id, "job updated");
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.jobs.delete_job(id).await? {
        tracing::info!(job_id = id, "job deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(job_not_found(id))
    }
}

/// POST /v1/jobs/{id}/run
///
/// 202 when dispatched, 409 when a guard refused, 503 without a scheduler.
pub async fn run_job(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(scheduler) = &state.scheduler else {
        return Ok(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "scheduler is disabled",
        ));
    };
    let response = match scheduler.run_now(id, Utc::now()).await? {
        Dispatch::Started => (
            StatusCode::ACCEPTED,
            Json(RunResponse {
                job_id: id,
                status: "started",
                reason: None,
            }),
        ),
        Dispatch::Skipped(reason) => (
            StatusCode::CONFLICT,
            Json(RunResponse {
                job_id: id,
                status: "skipped",
                reason: Some(reason.to_string()),
            }),
        ),
    };
    Ok(response.into_response())
}

fn job_not_found(id: i64) -> ApiError {
    ApiError(FieldopsError::NotFound {
        entity: "job",
        id: id.to_string(),
    })
}

// --- contacts ---

fn validate_entry(entry: &mut ContactEntry) -> Result<(), FieldopsError> {
    entry.address = entry.address.trim().to_string();
    if entry.address.is_empty() {
        return Err(FieldopsError::Validation("contact address must not be empty".into()));
    }
    if let (Some(from), Some(until)) = (entry.valid_from, entry.valid_until) {
        if until < from {
            return Err(FieldopsError::Validation(
                "valid_until must not precede valid_from".into(),
            ));
        }
    }
    Ok(())
}

pub async fn list_contacts(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<ContactEntry>>, ApiError> {
    Ok(Json(state.contacts.list_entries().await?))
}

pub async fn get_contact(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<Json<ContactEntry>, ApiError> {
    state
        .contacts
        .get_entry(id)
        .await?
        .map(Json)
        .ok_or_else(|| contact_not_found(id))
}

pub async fn create_contact(
    State(state): State<GatewayState>,
    Json(mut entry): Json<ContactEntry>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    validate_entry(&mut entry)?;
    let id = state.contacts.create_entry(&entry).await?;
    tracing::info!(contact_id = id, "contact created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_contact(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(mut entry): Json<ContactEntry>,
) -> Result<Json<ContactEntry>, ApiError> {
    entry.id = id;
    validate_entry(&mut entry)?;
    state.contacts.update_entry(&entry).await?;
    tracing::info!(contact_id = id, "contact updated");
    Ok(Json(entry))
}

pub async fn delete_contact(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.contacts.delete_entry(id).await? {
        tracing::info!(contact_id = id, "contact deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(contact_not_found(id))
    }
}

fn contact_not_found(id: i64) -> ApiError {
    ApiError(FieldopsError::NotFound {
        entity: "contact",
        id: id.to_string(),
    })
}

pub async fn list_contact_lists(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<ContactList>>, ApiError> {
    Ok(Json(state.contacts.list_contact_lists().await?))
}

pub async fn create_contact_list(
    State(state): State<GatewayState>,
    Json(list): Json<ContactList>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    if list.name.trim().is_empty() {
        return Err(FieldopsError::Validation("contact list name must not be empty".into()).into());
    }
    let id = state.contacts.create_contact_list(&list).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

// --- diagnostics ---

/// GET /v1/logs?limit=N, newest first.
pub async fn get_logs(
    State(state): State<GatewayState>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(state.log.recent(limit))
}

/// GET /v1/sessions
pub async fn get_sessions(State(state): State<GatewayState>) -> Json<Vec<SessionInfo>> {
    Json(state.sessions.list())
}

// --- webhook ---

/// POST /v1/inbound
///
/// Accepts one bridge event. Irrelevant events (groups, our own echoes) are
/// acknowledged and dropped.
pub async fn post_inbound(
    State(state): State<GatewayState>,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    let Some(tx) = &state.inbound_tx else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "no transport accepts inbound messages");
    };
    let Some(message) = payload.into_inbound() else {
        return (StatusCode::ACCEPTED, Json(serde_json::json!({"status": "ignored"})))
            .into_response();
    };
    let id = message.id.clone();
    match tx.send(message).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({"status": "accepted", "id": id})),
        )
            .into_response(),
        Err(_) => {
            tracing::warn!(message_id = %id, "inbound queue closed, dropping webhook message");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "inbound queue closed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_validation_trims_address() {
        let mut entry = ContactEntry {
            address: "  5511987654321 ".into(),
            ..Default::default()
        };
        validate_entry(&mut entry).unwrap();
        assert_eq!(entry.address, "5511987654321");

        let mut blank = ContactEntry::default();
        assert!(matches!(
            validate_entry(&mut blank),
            Err(FieldopsError::Validation(_))
        ));
    }

    #[test]
    fn run_response_omits_missing_reason() {
        let json = serde_json::to_value(RunResponse {
            job_id: 3,
            status: "started",
            reason: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"job_id": 3, "status": "started"}));
    }
}
