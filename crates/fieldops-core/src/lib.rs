// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fieldops business-process bot.
//!
//! This crate provides the collaborator trait definitions, the workspace error
//! type, and the domain types shared by the conversation core, the scheduler
//! and the adapters.

pub mod address;
pub mod erp;
pub mod error;
pub mod job;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FieldopsError;
pub use types::{AdapterType, Capability, Coordinate, HealthStatus, InboundMessage};

// Re-export all collaborator traits at crate root.
pub use traits::{
    ContactStore, EmailSender, ErpClient, JobStore, MessagingTransport, PluginAdapter,
    PunchStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fieldops_error_variants_construct() {
        let _config = FieldopsError::Config("test".into());
        let _storage = FieldopsError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = FieldopsError::Transport {
            message: "test".into(),
            retryable: true,
            source: None,
        };
        let _not_found = FieldopsError::NotFound {
            entity: "job",
            id: "1".into(),
        };
        let _timeout = FieldopsError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = FieldopsError::Internal("test".into());
    }

    #[test]
    fn erp_error_classification() {
        let server = FieldopsError::Erp {
            status: Some(502),
            message: "bad gateway".into(),
            body: None,
        };
        assert!(server.is_server_error());
        assert!(server.is_transient());

        let client = FieldopsError::Erp {
            status: Some(404),
            message: "not found".into(),
            body: None,
        };
        assert!(!client.is_server_error());
        assert!(!client.is_transient());

        let network = FieldopsError::Erp {
            status: None,
            message: "connection refused".into(),
            body: None,
        };
        assert!(!network.is_server_error());
        assert!(network.is_transient());
    }

    #[test]
    fn transport_errors_are_transient_only_when_marked() {
        assert!(FieldopsError::TransportNotReady.is_transient());
        let fatal = FieldopsError::Transport {
            message: "invalid recipient".into(),
            retryable: false,
            source: None,
        };
        assert!(!fatal.is_transient());
        assert!(!FieldopsError::Validation("x".into()).is_transient());
    }

    #[test]
    fn adapter_type_round_trip() {
        use std::str::FromStr;
        for variant in [
            AdapterType::Transport,
            AdapterType::Erp,
            AdapterType::Storage,
            AdapterType::Email,
        ] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin<T: PluginAdapter>() {}
        fn _assert_transport<T: MessagingTransport>() {}
        fn _assert_erp<T: ErpClient>() {}
        fn _assert_email<T: EmailSender>() {}
        fn _assert_contacts<T: ContactStore>() {}
        fn _assert_jobs<T: JobStore>() {}
        fn _assert_punches<T: PunchStore>() {}
    }
}
