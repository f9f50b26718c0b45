// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Fieldops bot.
//!
//! WAL-mode SQLite with embedded migrations, a single background connection
//! via `tokio-rusqlite`, and typed query modules for the contact directory,
//! work sites and schedules, punch records and recurring jobs.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
