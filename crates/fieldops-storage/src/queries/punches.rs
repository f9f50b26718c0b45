// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-clock punch records.

use chrono::{DateTime, Utc};
use fieldops_core::types::{Coordinate, NewPunch, PunchRecord};
use fieldops_core::FieldopsError;
use rusqlite::{params, Row};

use crate::database::{enum_column, map_tr_err, Database};

fn punch_from_row(row: &Row<'_>) -> Result<PunchRecord, rusqlite::Error> {
    let direction: String = row.get(3)?;
    let lat: Option<f64> = row.get(5)?;
    let lng: Option<f64> = row.get(6)?;
    Ok(PunchRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        site_id: row.get(2)?,
        direction: enum_column(3, &direction)?,
        recorded_at: row.get(4)?,
        location: lat.zip(lng).map(|(lat, lng)| Coordinate::new(lat, lng)),
        distance_m: row.get(7)?,
        automatic: row.get(8)?,
    })
}

/// Punches of `user_id` in `[from, to)`, oldest first.
pub async fn punches_between(
    db: &Database,
    user_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<PunchRecord>, FieldopsError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, site_id, direction, recorded_at, latitude, longitude,
                        distance_m, automatic
                 FROM punch_records
                 WHERE user_id = ?1 AND recorded_at >= ?2 AND recorded_at < ?3
                 ORDER BY recorded_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![user_id, from, to], punch_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_punch(db: &Database, punch: &NewPunch) -> Result<PunchRecord, FieldopsError> {
    let p = punch.clone();
    let id = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO punch_records (user_id, site_id, direction, recorded_at,
                     latitude, longitude, distance_m, automatic)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    p.user_id,
                    p.site_id,
                    p.direction.to_string(),
                    p.recorded_at,
                    p.location.map(|c| c.lat),
                    p.location.map(|c| c.lng),
                    p.distance_m,
                    p.automatic,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(PunchRecord {
        id,
        user_id: punch.user_id,
        site_id: punch.site_id,
        direction: punch.direction,
        recorded_at: punch.recorded_at,
        location: punch.location,
        distance_m: punch.distance_m,
        automatic: punch.automatic,
    })
}
