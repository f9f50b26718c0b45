// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Fieldops integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Messaging transport with message injection, capture
//!   and scripted failures
//! - [`MockErp`] - In-memory ERP with clients, contracts, tickets and parts
//! - [`MockEmail`] - Email sender that records every message
//! - [`TestHarness`] - Router wired to a temp SQLite store and the mocks

pub mod harness;
pub mod mock_email;
pub mod mock_erp;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_email::MockEmail;
pub use mock_erp::MockErp;
pub use mock_transport::MockTransport;
