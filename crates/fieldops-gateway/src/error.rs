// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`FieldopsError`] onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fieldops_core::FieldopsError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Handler error wrapper so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(pub FieldopsError);

impl From<FieldopsError> for ApiError {
    fn from(e: FieldopsError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            FieldopsError::NotFound { .. } => StatusCode::NOT_FOUND,
            FieldopsError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FieldopsError::Transport { .. }
            | FieldopsError::TransportNotReady
            | FieldopsError::Erp { .. }
            | FieldopsError::Email { .. } => StatusCode::BAD_GATEWAY,
            FieldopsError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FieldopsError::Config(_) | FieldopsError::Storage { .. } | FieldopsError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        }
        error_response(status, self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let not_found = ApiError(FieldopsError::NotFound {
            entity: "job",
            id: "9".into(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError(FieldopsError::Validation("x".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError(FieldopsError::Internal("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_response_serializes() {
        let json = serde_json::to_string(&ErrorResponse {
            error: "something went wrong".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"something went wrong"}"#);
    }
}
