// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring job definitions and their run bookkeeping.

use chrono::{DateTime, Utc};
use fieldops_core::job::{JobDefinition, JobSpec, NotifiedSet};
use fieldops_core::types::WeekdayMask;
use fieldops_core::FieldopsError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{enum_column, json_column, map_tr_err, to_json, Database};

const JOB_COLUMNS: &str = "id, name, message, recipients, frequency, hour, minute, weekdays,
     enabled, kind, params, last_run, run_count, notified";

fn job_from_row(row: &Row<'_>) -> Result<JobDefinition, rusqlite::Error> {
    let recipients: String = row.get(3)?;
    let frequency: String = row.get(4)?;
    let kind: String = row.get(9)?;
    let job_params: String = row.get(10)?;
    let notified: String = row.get(13)?;
    Ok(JobDefinition {
        id: row.get(0)?,
        spec: JobSpec {
            name: row.get(1)?,
            message: row.get(2)?,
            recipients: json_column(3, &recipients)?,
            frequency: enum_column(4, &frequency)?,
            hour: row.get(5)?,
            minute: row.get(6)?,
            weekdays: WeekdayMask(row.get(7)?),
            enabled: row.get(8)?,
            kind: enum_column(9, &kind)?,
            params: json_column(10, &job_params)?,
        },
        last_run: row.get(11)?,
        run_count: row.get(12)?,
        notified: json_column(13, &notified)?,
    })
}

/// Encoded JSON columns of a spec, computed outside the connection thread.
struct EncodedSpec {
    spec: JobSpec,
    recipients: String,
    params: String,
}

impl EncodedSpec {
    fn new(spec: &JobSpec) -> Result<Self, FieldopsError> {
        Ok(Self {
            spec: spec.clone(),
            recipients: to_json(&spec.recipients)?,
            params: to_json(&spec.params)?,
        })
    }
}

pub async fn list_jobs(db: &Database) -> Result<Vec<JobDefinition>, FieldopsError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id ASC"))?;
            let rows = stmt.query_map([], job_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_job(db: &Database, id: i64) -> Result<Option<JobDefinition>, FieldopsError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                job_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a job and return it with fresh bookkeeping.
pub async fn create_job(db: &Database, spec: &JobSpec) -> Result<JobDefinition, FieldopsError> {
    let enc = EncodedSpec::new(spec)?;
    let id = db
        .connection()
        .call(move |conn| {
            let s = &enc.spec;
            conn.execute(
                "INSERT INTO jobs (name, message, recipients, frequency, hour, minute,
                     weekdays, enabled, kind, params)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    s.name,
                    s.message,
                    enc.recipients,
                    s.frequency.to_string(),
                    s.hour,
                    s.minute,
                    s.weekdays.0,
                    s.enabled,
                    s.kind.to_string(),
                    enc.params,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(JobDefinition {
        id,
        spec: spec.clone(),
        last_run: None,
        run_count: 0,
        notified: NotifiedSet::default(),
    })
}

/// Replace the administrable fields. Run bookkeeping is preserved.
pub async fn update_job(
    db: &Database,
    id: i64,
    spec: &JobSpec,
) -> Result<JobDefinition, FieldopsError> {
    let enc = EncodedSpec::new(spec)?;
    let changed = db
        .connection()
        .call(move |conn| {
            let s = &enc.spec;
            conn.execute(
                "UPDATE jobs SET name = ?2, message = ?3, recipients = ?4, frequency = ?5,
                     hour = ?6, minute = ?7, weekdays = ?8, enabled = ?9, kind = ?10,
                     params = ?11, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    id,
                    s.name,
                    s.message,
                    enc.recipients,
                    s.frequency.to_string(),
                    s.hour,
                    s.minute,
                    s.weekdays.0,
                    s.enabled,
                    s.kind.to_string(),
                    enc.params,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(FieldopsError::NotFound {
            entity: "job",
            id: id.to_string(),
        });
    }
    get_job(db, id).await?.ok_or_else(|| FieldopsError::NotFound {
        entity: "job",
        id: id.to_string(),
    })
}

pub async fn delete_job(db: &Database, id: i64) -> Result<bool, FieldopsError> {
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM jobs WHERE id = ?1", params![id]))
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// Stamp a run: `last_run`, `run_count + 1`, the notified set, and optionally disable.
pub async fn record_run(
    db: &Database,
    id: i64,
    ran_at: DateTime<Utc>,
    notified: &NotifiedSet,
    disable: bool,
) -> Result<(), FieldopsError> {
    let notified = to_json(notified)?;
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET last_run = ?2, run_count = run_count + 1, notified = ?3,
                     enabled = CASE WHEN ?4 THEN 0 ELSE enabled END,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, ran_at, notified, disable],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(FieldopsError::NotFound {
            entity: "job",
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use fieldops_core::job::{Frequency, JobKind, JobParams};

    fn spec() -> JobSpec {
        JobSpec {
            name: "saida".into(),
            message: "Lembre de bater o ponto de saida".into(),
            recipients: vec!["5511987654321".into()],
            frequency: Frequency::Weekly,
            hour: 18,
            minute: 0,
            weekdays: WeekdayMask::WORKDAYS,
            enabled: true,
            kind: JobKind::ExitPunchCheck,
            params: JobParams {
                tolerance_minutes: Some(20),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let created = create_job(&db, &spec()).await.unwrap();
        assert_eq!(created.run_count, 0);

        let fetched = get_job(&db, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let mut changed = spec();
        changed.minute = 30;
        changed.kind = JobKind::Broadcast;
        let updated = update_job(&db, created.id, &changed).await.unwrap();
        assert_eq!(updated.spec.minute, 30);
        assert_eq!(updated.spec.kind, JobKind::Broadcast);

        assert_eq!(list_jobs(&db).await.unwrap().len(), 1);
        assert!(delete_job(&db, created.id).await.unwrap());
        assert!(list_jobs(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_run_increments_and_optionally_disables() {
        let db = Database::open_in_memory().await.unwrap();
        let job = create_job(&db, &spec()).await.unwrap();
        let ran_at = Utc.with_ymd_and_hms(2026, 3, 2, 21, 15, 0).unwrap();
        let mut notified = NotifiedSet::default();
        notified.insert(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), 42);

        record_run(&db, job.id, ran_at, &notified, false).await.unwrap();
        record_run(&db, job.id, ran_at, &notified, true).await.unwrap();

        let stored = get_job(&db, job.id).await.unwrap().unwrap();
        assert_eq!(stored.run_count, 2);
        assert_eq!(stored.last_run, Some(ran_at));
        assert_eq!(stored.notified, notified);
        assert!(!stored.spec.enabled);
    }

    #[tokio::test]
    async fn update_preserves_bookkeeping() {
        let db = Database::open_in_memory().await.unwrap();
        let job = create_job(&db, &spec()).await.unwrap();
        let ran_at = Utc.with_ymd_and_hms(2026, 3, 2, 21, 15, 0).unwrap();
        record_run(&db, job.id, ran_at, &NotifiedSet::default(), false)
            .await
            .unwrap();

        let updated = update_job(&db, job.id, &spec()).await.unwrap();
        assert_eq!(updated.run_count, 1);
        assert_eq!(updated.last_run, Some(ran_at));
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_job(&db, 7).await.unwrap().is_none());
        assert!(matches!(
            update_job(&db, 7, &spec()).await,
            Err(FieldopsError::NotFound { entity: "job", .. })
        ));
        assert!(record_run(&db, 7, Utc::now(), &NotifiedSet::default(), false)
            .await
            .is_err());
    }
}
