// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock email sender that records messages instead of delivering them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use fieldops_core::traits::adapter::PluginAdapter;
use fieldops_core::traits::email::EmailSender;
use fieldops_core::types::{AdapterType, HealthStatus};
use fieldops_core::FieldopsError;

/// One captured email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct MockEmail {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl MockEmail {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }

    /// Make every subsequent send fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockEmail {
    fn name(&self) -> &str {
        "mock-email"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Email
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        Ok(())
    }
}

#[async_trait]
impl EmailSender for MockEmail {
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<(), FieldopsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FieldopsError::Email {
                message: "scripted failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(SentEmail {
            to: to.to_vec(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
