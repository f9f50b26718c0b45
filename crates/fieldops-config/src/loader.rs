// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./fieldops.toml` > `~/.config/fieldops/fieldops.toml` >
//! `/etc/fieldops/fieldops.toml`, with `FIELDOPS_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FieldopsConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/fieldops/fieldops.toml";
pub(crate) const LOCAL_CONFIG: &str = "fieldops.toml";

/// Config sections, used to turn `FIELDOPS_<SECTION>_<KEY>` into `section.key`.
const SECTIONS: &[&str] = &[
    "agent",
    "keywords",
    "storage",
    "erp",
    "bridge",
    "email",
    "gateway",
    "scheduler",
    "punch",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fieldops/fieldops.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fieldops/fieldops.toml`
/// 3. `~/.config/fieldops/fieldops.toml`
/// 4. `./fieldops.toml`
/// 5. `FIELDOPS_*` environment variables
pub fn load_config() -> Result<FieldopsConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<FieldopsConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldopsConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FieldopsConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldopsConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FieldopsConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `FIELDOPS_SCHEDULER_SEND_DELAY_MS` must become
/// `scheduler.send_delay_ms`, not `scheduler.send.delay.ms`.
fn env_provider() -> Env {
    Env::prefixed("FIELDOPS_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("agent_timezone"), "agent.timezone");
        assert_eq!(
            map_env_key("scheduler_send_delay_ms"),
            "scheduler.send_delay_ms"
        );
        assert_eq!(map_env_key("erp_api_token"), "erp.api_token");
        assert_eq!(map_env_key("punch_enforce_geofence"), "punch.enforce_geofence");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
