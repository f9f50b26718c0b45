// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin control surface for the Fieldops bot.
//!
//! An axum server exposing job and contact administration, manual job runs,
//! the execution log and a session snapshot behind a bearer token, plus the
//! webhook the messaging bridge posts inbound messages to. `GET /health` is
//! the only public route.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState};
