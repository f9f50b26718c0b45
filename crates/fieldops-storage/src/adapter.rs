// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the persistence traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use fieldops_config::model::StorageConfig;
use fieldops_core::job::{JobDefinition, JobSpec, NotifiedSet};
use fieldops_core::types::{
    Contact, ContactEntry, ContactList, NewPunch, PunchRecord, WorkSchedule, WorkSite,
};
use fieldops_core::{
    AdapterType, ContactStore, FieldopsError, HealthStatus, JobStore, PluginAdapter, PunchStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for contacts, jobs, sites, schedules and punches.
///
/// The database is opened lazily by [`SqliteStore::initialize`]; every trait
/// method fails with a storage error before that.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and apply migrations.
    pub async fn initialize(&self) -> Result<(), FieldopsError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FieldopsError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, FieldopsError> {
        self.db.get().ok_or_else(|| FieldopsError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldopsError> {
        self.db()?
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldopsError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn list_contacts(&self) -> Result<Vec<Contact>, FieldopsError> {
        queries::contacts::list_contacts(self.db()?).await
    }

    async fn list_entries(&self) -> Result<Vec<ContactEntry>, FieldopsError> {
        queries::contacts::list_entries(self.db()?).await
    }

    async fn get_entry(&self, id: i64) -> Result<Option<ContactEntry>, FieldopsError> {
        queries::contacts::get_entry(self.db()?, id).await
    }

    async fn create_entry(&self, entry: &ContactEntry) -> Result<i64, FieldopsError> {
        queries::contacts::create_entry(self.db()?, entry).await
    }

    async fn update_entry(&self, entry: &ContactEntry) -> Result<(), FieldopsError> {
        queries::contacts::update_entry(self.db()?, entry).await
    }

    async fn delete_entry(&self, id: i64) -> Result<bool, FieldopsError> {
        queries::contacts::delete_entry(self.db()?, id).await
    }

    async fn list_contact_lists(&self) -> Result<Vec<ContactList>, FieldopsError> {
        queries::contacts::list_contact_lists(self.db()?).await
    }

    async fn create_contact_list(&self, list: &ContactList) -> Result<i64, FieldopsError> {
        queries::contacts::create_contact_list(self.db()?, list).await
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn list_jobs(&self) -> Result<Vec<JobDefinition>, FieldopsError> {
        queries::jobs::list_jobs(self.db()?).await
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobDefinition>, FieldopsError> {
        queries::jobs::get_job(self.db()?, id).await
    }

    async fn create_job(&self, spec: &JobSpec) -> Result<JobDefinition, FieldopsError> {
        queries::jobs::create_job(self.db()?, spec).await
    }

    async fn update_job(&self, id: i64, spec: &JobSpec) -> Result<JobDefinition, FieldopsError> {
        queries::jobs::update_job(self.db()?, id, spec).await
    }

    async fn delete_job(&self, id: i64) -> Result<bool, FieldopsError> {
        queries::jobs::delete_job(self.db()?, id).await
    }

    async fn record_run(
        &self,
        id: i64,
        ran_at: DateTime<Utc>,
        notified: &NotifiedSet,
        disable: bool,
    ) -> Result<(), FieldopsError> {
        queries::jobs::record_run(self.db()?, id, ran_at, notified, disable).await
    }
}

#[async_trait]
impl PunchStore for SqliteStore {
    async fn punches_between(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PunchRecord>, FieldopsError> {
        queries::punches::punches_between(self.db()?, user_id, from, to).await
    }

    async fn insert_punch(&self, punch: &NewPunch) -> Result<PunchRecord, FieldopsError> {
        queries::punches::insert_punch(self.db()?, punch).await
    }

    async fn sites(&self, ids: &[i64]) -> Result<Vec<WorkSite>, FieldopsError> {
        queries::sites::sites_by_ids(self.db()?, ids).await
    }

    async fn list_sites(&self) -> Result<Vec<WorkSite>, FieldopsError> {
        queries::sites::list_sites(self.db()?).await
    }

    async fn upsert_site(&self, site: &WorkSite) -> Result<i64, FieldopsError> {
        queries::sites::upsert_site(self.db()?, site).await
    }

    async fn work_schedule(&self, user_id: i64) -> Result<Option<WorkSchedule>, FieldopsError> {
        queries::schedules::work_schedule(self.db()?, user_id).await
    }

    async fn upsert_schedule(&self, schedule: &WorkSchedule) -> Result<(), FieldopsError> {
        queries::schedules::upsert_schedule(self.db()?, schedule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_store_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists());
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(dir.path().join("x.db").to_str().unwrap()));
        assert!(store.health_check().await.is_err());
        assert!(store.list_jobs().await.is_err());
        // Shutdown without a database is a no-op.
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn health_and_shutdown_after_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }
}
