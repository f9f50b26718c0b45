// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldops config` command implementation.

use fieldops_config::model::FieldopsConfig;

const REDACTED: &str = "[redacted]";

fn redact(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some(REDACTED.to_string());
    }
}

/// The effective configuration as TOML with every credential masked.
pub fn render_redacted(config: &FieldopsConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    redact(&mut shown.erp.api_token);
    redact(&mut shown.bridge.token);
    redact(&mut shown.email.password);
    redact(&mut shown.gateway.bearer_token);
    toml::to_string_pretty(&shown)
}
