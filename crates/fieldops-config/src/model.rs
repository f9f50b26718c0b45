// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fieldops bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Fieldops configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldopsConfig {
    /// Bot identity, timezone and session behaviour.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Keyword overrides for the conversation router.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// ERP/ticketing API settings.
    #[serde(default)]
    pub erp: ErpConfig,

    /// Messaging bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// SMTP settings for emailed reports.
    #[serde(default)]
    pub email: EmailConfig,

    /// Admin HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Recurring-job scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Time-clock punch settings.
    #[serde(default)]
    pub punch: PunchConfig,
}

/// Bot identity and session behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs and the help copy.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA name of the business timezone.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Inactivity after which a dialog is evicted.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// How often the expiry sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Idle time after which a per-sender worker retires.
    #[serde(default = "default_idle_worker_secs")]
    pub idle_worker_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            timezone: default_timezone(),
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            idle_worker_secs: default_idle_worker_secs(),
        }
    }
}

fn default_agent_name() -> String {
    "fieldops".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

fn default_idle_worker_secs() -> u64 {
    60
}

/// Keyword overrides. Empty lists keep the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordsConfig {
    #[serde(default)]
    pub cancel: Vec<String>,
    #[serde(default)]
    pub intervention: Vec<String>,
    #[serde(default)]
    pub ticket_close: Vec<String>,
    #[serde(default)]
    pub ticket_create: Vec<String>,
    #[serde(default)]
    pub punch: Vec<String>,
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("fieldops").join("fieldops.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("fieldops.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// ERP/ticketing API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ErpConfig {
    /// Base URL, e.g. `https://erp.example.com/api`.
    #[serde(default = "default_erp_base_url")]
    pub base_url: String,

    /// Bearer token sent on every request.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request network timeout.
    #[serde(default = "default_erp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: default_erp_base_url(),
            api_token: None,
            timeout_secs: default_erp_timeout_secs(),
        }
    }
}

fn default_erp_base_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_erp_timeout_secs() -> u64 {
    30
}

/// Messaging bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the bridge process driving the messaging app.
    #[serde(default = "default_bridge_base_url")]
    pub base_url: String,

    /// Bearer token for the bridge.
    #[serde(default)]
    pub token: Option<String>,

    /// Readiness checks before a send gives up.
    #[serde(default = "default_ready_retries")]
    pub ready_retries: u32,

    /// Delay between readiness checks (doubled each attempt).
    #[serde(default = "default_ready_backoff_ms")]
    pub ready_backoff_ms: u64,

    /// Upper bound for the reconnect backoff.
    #[serde(default = "default_reconnect_max_backoff_secs")]
    pub reconnect_max_backoff_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_base_url(),
            token: None,
            ready_retries: default_ready_retries(),
            ready_backoff_ms: default_ready_backoff_ms(),
            reconnect_max_backoff_secs: default_reconnect_max_backoff_secs(),
        }
    }
}

fn default_bridge_base_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_ready_retries() -> u32 {
    5
}

fn default_ready_backoff_ms() -> u64 {
    500
}

fn default_reconnect_max_backoff_secs() -> u64 {
    60
}

/// SMTP configuration for the emailed-report job.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay host. `None` disables emailed reports.
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// From address, e.g. `Fieldops <bot@example.com>`.
    #[serde(default = "default_email_from")]
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from: default_email_from(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_email_from() -> String {
    "fieldops@localhost".to_string()
}

/// Admin HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. Without it every request is rejected.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Recurring-job scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Minimum gap between two runs of the same job.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Delay between recipients when a job sends to many users.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Default minutes after the scheduled exit before a reminder (10..=30).
    #[serde(default = "default_exit_tolerance_minutes")]
    pub exit_tolerance_minutes: u32,

    /// Capacity of the execution log ring buffer.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
            min_interval_secs: default_min_interval_secs(),
            send_delay_ms: default_send_delay_ms(),
            exit_tolerance_minutes: default_exit_tolerance_minutes(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_tick_secs() -> u64 {
    60
}

fn default_min_interval_secs() -> u64 {
    3 * 60
}

fn default_send_delay_ms() -> u64 {
    2_000
}

fn default_exit_tolerance_minutes() -> u32 {
    15
}

fn default_log_capacity() -> usize {
    500
}

/// Time-clock punch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PunchConfig {
    /// Reject locations outside a site's radius.
    #[serde(default = "default_true")]
    pub enforce_geofence: bool,
}

impl Default for PunchConfig {
    fn default() -> Self {
        Self {
            enforce_geofence: true,
        }
    }
}
