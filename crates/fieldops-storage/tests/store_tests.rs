// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of `SqliteStore` through the persistence traits.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use fieldops_config::model::StorageConfig;
use fieldops_core::job::{Frequency, JobKind, JobParams, JobSpec, NotifiedSet};
use fieldops_core::types::{
    ContactEntry, ContactList, Coordinate, NewPunch, PunchDirection, WeekdayMask, WorkSchedule,
    WorkSite,
};
use fieldops_core::{ContactStore, JobStore, PluginAdapter, PunchStore};
use fieldops_storage::SqliteStore;

async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
    let store = SqliteStore::new(StorageConfig {
        database_path: dir.path().join("fieldops.db").display().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    store
}

#[tokio::test]
async fn contact_directory_resolves_through_trait() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    let list_id = store
        .create_contact_list(&ContactList {
            id: 0,
            name: "Tecnicos".into(),
            can_create_tickets: true,
            can_register_punch: true,
            valid_from: None,
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 31),
        })
        .await
        .unwrap();
    store
        .create_entry(&ContactEntry {
            id: 0,
            address: "5511987654321".into(),
            name: "Carlos".into(),
            list_id: Some(list_id),
            can_create_tickets: None,
            can_register_punch: Some(false),
            technician_id: Some("  ".into()),
            client_id: Some("C001".into()),
            user_id: Some(9),
            site_ids: vec![1],
            valid_from: None,
            valid_until: None,
        })
        .await
        .unwrap();

    let contacts = store.list_contacts().await.unwrap();
    assert_eq!(contacts.len(), 1);
    let c = &contacts[0];
    assert!(c.can_create_tickets);
    assert!(!c.can_register_punch);
    assert_eq!(c.technician_id, None, "blank ids resolve to None");
    assert_eq!(c.client_id.as_deref(), Some("C001"));
    assert_eq!(c.valid_until, NaiveDate::from_ymd_opt(2026, 12, 31));
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open_store(&dir).await;
        store
            .create_job(&JobSpec {
                name: "bom dia".into(),
                message: "Bom dia! Hoje e {data}".into(),
                recipients: vec!["5511987654321".into()],
                frequency: Frequency::Daily,
                hour: 7,
                minute: 30,
                weekdays: WeekdayMask::ALL,
                enabled: true,
                kind: JobKind::Broadcast,
                params: JobParams::default(),
            })
            .await
            .unwrap();
        let site_id = store
            .upsert_site(&WorkSite {
                id: 0,
                name: "Obra Norte".into(),
                location: Some(Coordinate::new(-23.5, -46.6)),
                radius_m: Some(200.0),
            })
            .await
            .unwrap();
        store
            .upsert_schedule(&WorkSchedule {
                user_id: 9,
                entry_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                exit_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                lunch_start: None,
                weekdays: WeekdayMask::WORKDAYS,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();
        store
            .insert_punch(&NewPunch {
                user_id: 9,
                site_id,
                direction: PunchDirection::Entry,
                recorded_at: Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
                location: Some(Coordinate::new(-23.5001, -46.6001)),
                distance_m: Some(14.0),
                automatic: false,
            })
            .await
            .unwrap();
        store.shutdown().await.unwrap();
    }

    let store = open_store(&dir).await;
    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    store
        .record_run(jobs[0].id, Utc::now(), &NotifiedSet::default(), false)
        .await
        .unwrap();
    assert_eq!(store.get_job(jobs[0].id).await.unwrap().unwrap().run_count, 1);
    assert_eq!(store.sites(&[1]).await.unwrap()[0].name, "Obra Norte");
    assert!(store.work_schedule(9).await.unwrap().is_some());
    let punches = store
        .punches_between(
            9,
            Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 3, 3, 0, 0).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(punches.len(), 1);
}
