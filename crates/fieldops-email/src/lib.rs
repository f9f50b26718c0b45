// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP delivery for the emailed punch report.
//!
//! [`SmtpEmailSender`] implements [`EmailSender`] on a pooled lettre
//! transport. Port 465 uses implicit TLS, loopback hosts use plain SMTP (local
//! relays and mail catchers), everything else uses STARTTLS.

use async_trait::async_trait;
use fieldops_config::model::EmailConfig;
use fieldops_core::traits::{EmailSender, PluginAdapter};
use fieldops_core::types::{AdapterType, HealthStatus};
use fieldops_core::FieldopsError;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

fn parse_mailbox(address: &str) -> Result<Mailbox, FieldopsError> {
    address
        .trim()
        .parse()
        .map_err(|e| FieldopsError::Validation(format!("invalid email address {address:?}: {e}")))
}

impl SmtpEmailSender {
    /// Builds the sender, or `Ok(None)` when no SMTP host is configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, FieldopsError> {
        let Some(host) = config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) else {
            debug!("no smtp host configured, emailed reports disabled");
            return Ok(None);
        };
        let from = parse_mailbox(&config.from)
            .map_err(|e| FieldopsError::Config(format!("email.from: {e}")))?;

        let smtp_error = |e: lettre::transport::smtp::Error| FieldopsError::Config(format!(
            "smtp relay {host}: {e}"
        ));
        let mut builder = if is_loopback(host) {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(smtp_error)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(smtp_error)?
        };
        builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(host, port = config.smtp_port, "smtp sender initialized");
        Ok(Some(Self {
            transport: builder.build(),
            from,
            host: host.to_string(),
        }))
    }

    fn build_message(&self, to: &[String], subject: &str, html: &str) -> Result<Message, FieldopsError> {
        if to.is_empty() {
            return Err(FieldopsError::Validation("email has no recipients".into()));
        }
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for address in to {
            builder = builder.to(parse_mailbox(address)?);
        }
        builder
            .header(header::ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| FieldopsError::Email {
                message: format!("failed to build message: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl PluginAdapter for SmtpEmailSender {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Email
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded(format!(
                "smtp relay {} refused the connection test",
                self.host
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("smtp relay {}: {e}", self.host))),
        }
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<(), FieldopsError> {
        let message = self.build_message(to, subject, html)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!(recipients = to.len(), subject, "email sent");
                Ok(())
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "email delivery failed");
                Err(FieldopsError::Email {
                    message: format!("smtp delivery failed: {e}"),
                    source: Some(Box::new(e)),
                })
            }
        }
    }
}
