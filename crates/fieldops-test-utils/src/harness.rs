// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` assembles the router with a temp SQLite store, a [`MockErp`]
//! and a session store, and drives it with a controllable clock. The default
//! clock is Monday 2026-05-04 10:00 in São Paulo.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use fieldops_agent::{Collaborators, Router, SessionStore};
use fieldops_config::model::{FieldopsConfig, StorageConfig};
use fieldops_core::types::{ContactEntry, Coordinate, InboundMessage, WorkSite};
use fieldops_core::{ContactStore, FieldopsError, PunchStore};
use fieldops_storage::SqliteStore;

use crate::mock_erp::MockErp;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: FieldopsConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: FieldopsConfig::default(),
        }
    }

    /// Replace the whole configuration (storage path is always overridden).
    pub fn with_config(mut self, config: FieldopsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_geofence(mut self, enforce: bool) -> Self {
        self.config.punch.enforce_geofence = enforce;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, FieldopsError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FieldopsError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let store = Arc::new(SqliteStore::new(config.storage.clone()));
        store.initialize().await?;
        let erp = Arc::new(MockErp::new());
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            config.agent.session_ttl_secs,
        )));
        let router = Arc::new(Router::new(
            &config,
            Collaborators {
                contacts: store.clone(),
                punches: store.clone(),
                erp: erp.clone(),
            },
            sessions.clone(),
        )?);

        Ok(TestHarness {
            store,
            erp,
            sessions,
            router,
            config,
            clock: Mutex::new(TestHarness::default_clock()),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete conversation environment with mock collaborators and temp storage.
pub struct TestHarness {
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    /// The mock ERP.
    pub erp: Arc<MockErp>,
    pub sessions: Arc<SessionStore>,
    pub router: Arc<Router>,
    pub config: FieldopsConfig,
    clock: Mutex<DateTime<Utc>>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Monday 2026-05-04 13:00 UTC, 10:00 in São Paulo.
    pub fn default_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 13, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub async fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().await
    }

    pub async fn set_clock(&self, at: DateTime<Utc>) {
        *self.clock.lock().await = at;
    }

    pub async fn advance_clock(&self, by: chrono::Duration) {
        let mut clock = self.clock.lock().await;
        *clock += by;
    }

    /// Route a text message from `sender` at the harness clock.
    pub async fn send(&self, sender: &str, text: &str) -> Vec<String> {
        let now = self.now().await;
        let mut msg = InboundMessage::text(uuid::Uuid::new_v4().to_string(), sender, text);
        msg.received_at = now;
        self.router.route(&msg, now).await
    }

    /// Route a native location share from `sender` at the harness clock.
    pub async fn send_location(&self, sender: &str, at: Coordinate) -> Vec<String> {
        let now = self.now().await;
        let mut msg = InboundMessage::location(uuid::Uuid::new_v4().to_string(), sender, at);
        msg.received_at = now;
        self.router.route(&msg, now).await
    }

    /// Route a message stamped `received_at` by the sender, processed at the
    /// harness clock.
    pub async fn deliver(&self, msg: InboundMessage) -> Vec<String> {
        let now = self.now().await;
        self.router.route(&msg, now).await
    }

    /// Insert a contact; returns its id.
    pub async fn add_contact(&self, entry: ContactEntry) -> Result<i64, FieldopsError> {
        self.store.create_entry(&entry).await
    }

    /// A technician allowed to create, close and log tickets.
    pub async fn add_technician(&self, address: &str, technician_id: &str) -> Result<i64, FieldopsError> {
        self.add_contact(ContactEntry {
            address: address.to_string(),
            name: "Técnico".to_string(),
            can_create_tickets: Some(true),
            technician_id: Some(technician_id.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Insert a site; returns its id.
    pub async fn add_site(&self, name: &str, location: Option<Coordinate>, radius_m: Option<f64>) -> Result<i64, FieldopsError> {
        self.store
            .upsert_site(&WorkSite {
                id: 0,
                name: name.to_string(),
                location,
                radius_m,
            })
            .await
    }
}
