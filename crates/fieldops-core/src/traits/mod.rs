// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Transport, ERP and email adapters extend the [`PluginAdapter`] base trait and
//! use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod email;
pub mod erp;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use email::EmailSender;
pub use erp::ErpClient;
pub use storage::{ContactStore, JobStore, PunchStore};
pub use transport::MessagingTransport;
