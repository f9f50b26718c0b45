// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact directory and contact lists.

use std::collections::HashMap;

use fieldops_core::types::{Contact, ContactEntry, ContactList};
use fieldops_core::FieldopsError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{json_column, map_tr_err, to_json, Database};

const ENTRY_COLUMNS: &str = "id, address, name, list_id, can_create_tickets, can_register_punch,
     technician_id, client_id, user_id, site_ids, valid_from, valid_until";

fn entry_from_row(row: &Row<'_>) -> Result<ContactEntry, rusqlite::Error> {
    let site_ids: String = row.get(9)?;
    Ok(ContactEntry {
        id: row.get(0)?,
        address: row.get(1)?,
        name: row.get(2)?,
        list_id: row.get(3)?,
        can_create_tickets: row.get(4)?,
        can_register_punch: row.get(5)?,
        technician_id: row.get(6)?,
        client_id: row.get(7)?,
        user_id: row.get(8)?,
        site_ids: json_column(9, &site_ids)?,
        valid_from: row.get(10)?,
        valid_until: row.get(11)?,
    })
}

fn list_from_row(row: &Row<'_>) -> Result<ContactList, rusqlite::Error> {
    Ok(ContactList {
        id: row.get(0)?,
        name: row.get(1)?,
        can_create_tickets: row.get(2)?,
        can_register_punch: row.get(3)?,
        valid_from: row.get(4)?,
        valid_until: row.get(5)?,
    })
}

/// All raw contact rows, ordered by id.
pub async fn list_entries(db: &Database) -> Result<Vec<ContactEntry>, FieldopsError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM contacts ORDER BY id ASC"))?;
            let rows = stmt.query_map([], entry_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_entry(db: &Database, id: i64) -> Result<Option<ContactEntry>, FieldopsError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a contact row. The `id` field of `entry` is ignored.
pub async fn create_entry(db: &Database, entry: &ContactEntry) -> Result<i64, FieldopsError> {
    let site_ids = to_json(&entry.site_ids)?;
    let e = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (address, name, list_id, can_create_tickets,
                     can_register_punch, technician_id, client_id, user_id, site_ids,
                     valid_from, valid_until)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    e.address,
                    e.name,
                    e.list_id,
                    e.can_create_tickets,
                    e.can_register_punch,
                    e.technician_id,
                    e.client_id,
                    e.user_id,
                    site_ids,
                    e.valid_from,
                    e.valid_until,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace every column of an existing contact row.
pub async fn update_entry(db: &Database, entry: &ContactEntry) -> Result<(), FieldopsError> {
    let site_ids = to_json(&entry.site_ids)?;
    let e = entry.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET address = ?2, name = ?3, list_id = ?4,
                     can_create_tickets = ?5, can_register_punch = ?6, technician_id = ?7,
                     client_id = ?8, user_id = ?9, site_ids = ?10, valid_from = ?11,
                     valid_until = ?12
                 WHERE id = ?1",
                params![
                    e.id,
                    e.address,
                    e.name,
                    e.list_id,
                    e.can_create_tickets,
                    e.can_register_punch,
                    e.technician_id,
                    e.client_id,
                    e.user_id,
                    site_ids,
                    e.valid_from,
                    e.valid_until,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(FieldopsError::NotFound {
            entity: "contact",
            id: entry.id.to_string(),
        });
    }
    Ok(())
}

/// Returns `true` when a row was deleted.
pub async fn delete_entry(db: &Database, id: i64) -> Result<bool, FieldopsError> {
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM contacts WHERE id = ?1", params![id]))
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

pub async fn list_contact_lists(db: &Database) -> Result<Vec<ContactList>, FieldopsError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, can_create_tickets, can_register_punch, valid_from, valid_until
                 FROM contact_lists ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], list_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn create_contact_list(db: &Database, list: &ContactList) -> Result<i64, FieldopsError> {
    let l = list.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contact_lists (name, can_create_tickets, can_register_punch,
                     valid_from, valid_until)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    l.name,
                    l.can_create_tickets,
                    l.can_register_punch,
                    l.valid_from,
                    l.valid_until
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Every contact with its list defaults folded in.
pub async fn list_contacts(db: &Database) -> Result<Vec<Contact>, FieldopsError> {
    let lists: HashMap<i64, ContactList> = list_contact_lists(db)
        .await?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();
    let entries = list_entries(db).await?;
    Ok(entries
        .iter()
        .map(|e| Contact::resolve(e, e.list_id.and_then(|id| lists.get(&id))))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(address: &str) -> ContactEntry {
        ContactEntry {
            id: 0,
            address: address.into(),
            name: "Joana".into(),
            list_id: None,
            can_create_tickets: Some(true),
            can_register_punch: None,
            technician_id: Some("T7".into()),
            client_id: None,
            user_id: Some(42),
            site_ids: vec![1, 2],
            valid_from: None,
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 31),
        }
    }

    #[tokio::test]
    async fn entry_crud_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        let id = create_entry(&db, &entry("5511987654321")).await.unwrap();

        let mut stored = get_entry(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.site_ids, vec![1, 2]);
        assert_eq!(stored.can_register_punch, None);
        assert_eq!(stored.valid_until, NaiveDate::from_ymd_opt(2026, 12, 31));

        stored.name = "Joana Silva".into();
        stored.site_ids = vec![3];
        update_entry(&db, &stored).await.unwrap();
        let updated = get_entry(&db, id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Joana Silva");
        assert_eq!(updated.site_ids, vec![3]);

        assert!(delete_entry(&db, id).await.unwrap());
        assert!(!delete_entry(&db, id).await.unwrap());
        assert!(get_entry(&db, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_entry_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let mut e = entry("551100000000");
        e.id = 999;
        let err = update_entry(&db, &e).await.unwrap_err();
        assert!(matches!(err, FieldopsError::NotFound { entity: "contact", .. }));
    }

    #[tokio::test]
    async fn list_contacts_inherits_list_defaults() {
        let db = Database::open_in_memory().await.unwrap();
        let list_id = create_contact_list(
            &db,
            &ContactList {
                id: 0,
                name: "Campo".into(),
                can_create_tickets: false,
                can_register_punch: true,
                valid_from: NaiveDate::from_ymd_opt(2026, 1, 1),
                valid_until: None,
            },
        )
        .await
        .unwrap();

        let mut e = entry("5511987654321");
        e.list_id = Some(list_id);
        create_entry(&db, &e).await.unwrap();

        let contacts = list_contacts(&db).await.unwrap();
        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        // Entry value wins, NULL inherits from the list.
        assert!(c.can_create_tickets);
        assert!(c.can_register_punch);
        assert_eq!(c.valid_from, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(c.valid_until, NaiveDate::from_ymd_opt(2026, 12, 31));
    }

    #[tokio::test]
    async fn deleting_list_detaches_entries() {
        let db = Database::open_in_memory().await.unwrap();
        let list_id = create_contact_list(
            &db,
            &ContactList {
                id: 0,
                name: "Temporarios".into(),
                can_create_tickets: true,
                can_register_punch: false,
                valid_from: None,
                valid_until: None,
            },
        )
        .await
        .unwrap();
        let mut e = entry("5511911112222");
        e.list_id = Some(list_id);
        let id = create_entry(&db, &e).await.unwrap();

        db.connection()
            .call(move |conn| {
                conn.execute("DELETE FROM contact_lists WHERE id = ?1", params![list_id])
            })
            .await
            .unwrap();
        assert_eq!(get_entry(&db, id).await.unwrap().unwrap().list_id, None);
    }
}
