// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::FieldopsConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration. Collects every error instead of
/// failing on the first one.
pub fn validate_config(config: &FieldopsConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Err(e) = fieldops_core::time::parse_timezone(&config.agent.timezone) {
        errors.push(ConfigError::validation(format!("agent.timezone: {e}")));
    }

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.agent.session_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "agent.session_ttl_secs must be greater than zero",
        ));
    }
    if config.agent.sweep_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "agent.sweep_interval_secs must be greater than zero",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    for (key, url) in [
        ("erp.base_url", &config.erp.base_url),
        ("bridge.base_url", &config.bridge.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "{key} `{url}` must start with http:// or https://"
            )));
        }
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            errors.push(ConfigError::validation(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.scheduler.tick_secs == 0 {
        errors.push(ConfigError::validation(
            "scheduler.tick_secs must be greater than zero",
        ));
    }
    if !(10..=30).contains(&config.scheduler.exit_tolerance_minutes) {
        errors.push(ConfigError::validation(format!(
            "scheduler.exit_tolerance_minutes must be between 10 and 30, got {}",
            config.scheduler.exit_tolerance_minutes
        )));
    }
    if config.scheduler.log_capacity == 0 {
        errors.push(ConfigError::validation(
            "scheduler.log_capacity must be greater than zero",
        ));
    }

    for (name, list) in [
        ("cancel", &config.keywords.cancel),
        ("intervention", &config.keywords.intervention),
        ("ticket_close", &config.keywords.ticket_close),
        ("ticket_create", &config.keywords.ticket_create),
        ("punch", &config.keywords.punch),
    ] {
        if list.iter().any(|k| k.trim().is_empty()) {
            errors.push(ConfigError::validation(format!(
                "keywords.{name} must not contain empty entries"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&FieldopsConfig::default()).is_ok());
    }

    #[test]
    fn unknown_timezone_fails_validation() {
        let mut config = FieldopsConfig::default();
        config.agent.timezone = "America/Atlantis".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "agent.timezone"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FieldopsConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn tolerance_outside_range_fails_validation() {
        let mut config = FieldopsConfig::default();
        config.scheduler.exit_tolerance_minutes = 45;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "exit_tolerance_minutes"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = FieldopsConfig::default();
        config.agent.timezone = "nowhere".to_string();
        config.erp.base_url = "erp.local".to_string();
        config.scheduler.tick_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_keyword_rejected() {
        let mut config = FieldopsConfig::default();
        config.keywords.punch = vec!["ponto".into(), " ".into()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "keywords.punch"));
    }
}
