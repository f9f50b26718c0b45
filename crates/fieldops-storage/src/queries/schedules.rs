// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user work schedules.

use fieldops_core::types::{WeekdayMask, WorkSchedule};
use fieldops_core::FieldopsError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

pub async fn work_schedule(
    db: &Database,
    user_id: i64,
) -> Result<Option<WorkSchedule>, FieldopsError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, entry_time, exit_time, lunch_start, weekdays, valid_from,
                        valid_until
                 FROM work_schedules WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(WorkSchedule {
                        user_id: row.get(0)?,
                        entry_time: row.get(1)?,
                        exit_time: row.get(2)?,
                        lunch_start: row.get(3)?,
                        weekdays: WeekdayMask(row.get(4)?),
                        valid_from: row.get(5)?,
                        valid_until: row.get(6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// One schedule per user; a second upsert replaces the first.
pub async fn upsert_schedule(db: &Database, schedule: &WorkSchedule) -> Result<(), FieldopsError> {
    let s = schedule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO work_schedules (user_id, entry_time, exit_time, lunch_start,
                     weekdays, valid_from, valid_until)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET entry_time = excluded.entry_time,
                     exit_time = excluded.exit_time, lunch_start = excluded.lunch_start,
                     weekdays = excluded.weekdays, valid_from = excluded.valid_from,
                     valid_until = excluded.valid_until",
                params![
                    s.user_id,
                    s.entry_time,
                    s.exit_time,
                    s.lunch_start,
                    s.weekdays.0,
                    s.valid_from,
                    s.valid_until
                ],
            )
            .map(|_| ())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[tokio::test]
    async fn upsert_replaces_existing_schedule() {
        let db = Database::open_in_memory().await.unwrap();
        let mut schedule = WorkSchedule {
            user_id: 42,
            entry_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            exit_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            lunch_start: Some(NaiveTime::from_hms_opt(12, 0, 0).unwrap()),
            weekdays: WeekdayMask::WORKDAYS,
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            valid_until: None,
        };
        upsert_schedule(&db, &schedule).await.unwrap();
        schedule.exit_time = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        schedule.lunch_start = None;
        upsert_schedule(&db, &schedule).await.unwrap();

        assert_eq!(work_schedule(&db, 42).await.unwrap(), Some(schedule));
        assert_eq!(work_schedule(&db, 7).await.unwrap(), None);
    }
}
