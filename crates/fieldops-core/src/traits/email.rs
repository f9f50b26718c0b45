// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email collaborator trait, used by the emailed-report job.

use async_trait::async_trait;

use crate::error::FieldopsError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait EmailSender: PluginAdapter {
    /// Sends one HTML message to every address in `to`.
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<(), FieldopsError>;
}
