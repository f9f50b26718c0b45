// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fieldops workspace.

use thiserror::Error;

/// The primary error type used across collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum FieldopsError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors.
    ///
    /// `retryable` marks connection/context-loss failures that should trigger a
    /// reconnect rather than be reported straight back to the caller.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        retryable: bool,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport reported it is not ready to send.
    #[error("transport not ready")]
    TransportNotReady,

    /// ERP collaborator errors. `status` is the HTTP status when a response arrived.
    #[error("erp error: {message}")]
    Erp {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },

    /// Email collaborator errors.
    #[error("email error: {message}")]
    Email {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected by a semantic check.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FieldopsError {
    /// True when the ERP answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, FieldopsError::Erp { status: Some(s), .. } if *s >= 500)
    }

    /// True for failures worth retrying after a reconnect or a short wait.
    pub fn is_transient(&self) -> bool {
        match self {
            FieldopsError::Transport { retryable, .. } => *retryable,
            FieldopsError::TransportNotReady | FieldopsError::Timeout { .. } => true,
            FieldopsError::Erp { status, .. } => match status {
                None => true,
                Some(s) => *s == 429 || *s >= 500,
            },
            _ => false,
        }
    }
}
