// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator traits.
//!
//! No transactions are assumed across entities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FieldopsError;
use crate::job::{JobDefinition, JobSpec, NotifiedSet};
use crate::types::{
    Contact, ContactEntry, ContactList, NewPunch, PunchRecord, WorkSchedule, WorkSite,
};

/// Contact directory.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Every contact resolved against its list.
    async fn list_contacts(&self) -> Result<Vec<Contact>, FieldopsError>;

    async fn list_entries(&self) -> Result<Vec<ContactEntry>, FieldopsError>;

    async fn get_entry(&self, id: i64) -> Result<Option<ContactEntry>, FieldopsError>;

    /// Inserts a contact and returns its id.
    async fn create_entry(&self, entry: &ContactEntry) -> Result<i64, FieldopsError>;

    /// Replaces the contact with `entry.id`; `NotFound` when it does not exist.
    async fn update_entry(&self, entry: &ContactEntry) -> Result<(), FieldopsError>;

    /// Returns whether a row was deleted.
    async fn delete_entry(&self, id: i64) -> Result<bool, FieldopsError>;

    async fn list_contact_lists(&self) -> Result<Vec<ContactList>, FieldopsError>;

    async fn create_contact_list(&self, list: &ContactList) -> Result<i64, FieldopsError>;
}

/// Recurring job definitions and their run bookkeeping.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<JobDefinition>, FieldopsError>;

    async fn get_job(&self, id: i64) -> Result<Option<JobDefinition>, FieldopsError>;

    async fn create_job(&self, spec: &JobSpec) -> Result<JobDefinition, FieldopsError>;

    /// Replaces the administrable fields; `NotFound` when the job does not exist.
    async fn update_job(&self, id: i64, spec: &JobSpec) -> Result<JobDefinition, FieldopsError>;

    async fn delete_job(&self, id: i64) -> Result<bool, FieldopsError>;

    /// Stores `last_run`, increments the run counter and persists the notified set.
    /// `disable` turns the job off (one-shot jobs).
    async fn record_run(
        &self,
        id: i64,
        ran_at: DateTime<Utc>,
        notified: &NotifiedSet,
        disable: bool,
    ) -> Result<(), FieldopsError>;
}

/// Punch records, work sites and work schedules.
#[async_trait]
pub trait PunchStore: Send + Sync {
    /// Punches of `user_id` with `from <= recorded_at < to`, oldest first.
    async fn punches_between(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PunchRecord>, FieldopsError>;

    async fn insert_punch(&self, punch: &NewPunch) -> Result<PunchRecord, FieldopsError>;

    /// Sites with the given ids, in id order. Unknown ids are skipped.
    async fn sites(&self, ids: &[i64]) -> Result<Vec<WorkSite>, FieldopsError>;

    async fn list_sites(&self) -> Result<Vec<WorkSite>, FieldopsError>;

    /// Inserts or replaces a site and returns its id.
    async fn upsert_site(&self, site: &WorkSite) -> Result<i64, FieldopsError>;

    async fn work_schedule(&self, user_id: i64) -> Result<Option<WorkSchedule>, FieldopsError>;

    async fn upsert_schedule(&self, schedule: &WorkSchedule) -> Result<(), FieldopsError>;
}
