// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work sites.

use fieldops_core::types::{Coordinate, WorkSite};
use fieldops_core::FieldopsError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};

fn site_from_row(row: &Row<'_>) -> Result<WorkSite, rusqlite::Error> {
    let lat: Option<f64> = row.get(2)?;
    let lng: Option<f64> = row.get(3)?;
    Ok(WorkSite {
        id: row.get(0)?,
        name: row.get(1)?,
        location: lat.zip(lng).map(|(lat, lng)| Coordinate::new(lat, lng)),
        radius_m: row.get(4)?,
    })
}

pub async fn list_sites(db: &Database) -> Result<Vec<WorkSite>, FieldopsError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, latitude, longitude, radius_m FROM work_sites ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], site_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Sites with the given ids, in the order of `ids`. Unknown ids are skipped.
pub async fn sites_by_ids(db: &Database, ids: &[i64]) -> Result<Vec<WorkSite>, FieldopsError> {
    let all = list_sites(db).await?;
    Ok(ids
        .iter()
        .filter_map(|id| all.iter().find(|s| s.id == *id).cloned())
        .collect())
}

/// Insert when `site.id == 0`, otherwise replace the row with that id.
pub async fn upsert_site(db: &Database, site: &WorkSite) -> Result<i64, FieldopsError> {
    let s = site.clone();
    db.connection()
        .call(move |conn| {
            let (lat, lng) = (s.location.map(|c| c.lat), s.location.map(|c| c.lng));
            if s.id == 0 {
                conn.execute(
                    "INSERT INTO work_sites (name, latitude, longitude, radius_m)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![s.name, lat, lng, s.radius_m],
                )?;
                Ok(conn.last_insert_rowid())
            } else {
                conn.execute(
                    "INSERT INTO work_sites (id, name, latitude, longitude, radius_m)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                         latitude = excluded.latitude, longitude = excluded.longitude,
                         radius_m = excluded.radius_m",
                    params![s.id, s.name, lat, lng, s.radius_m],
                )?;
                Ok(s.id)
            }
        })
        .await
        .map_err(map_tr_err)
}
