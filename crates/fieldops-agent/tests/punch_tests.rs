// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Punch registration through the router, with a real SQLite store.

use chrono::Duration;
use fieldops_agent::copy;
use fieldops_agent::session::PendingInput;
use fieldops_core::types::{ContactEntry, Coordinate, PunchDirection, PunchRecord};
use fieldops_core::PunchStore;
use fieldops_test_utils::TestHarness;

const WORKER: &str = "5511911112222@c.us";
const USER_ID: i64 = 7;

fn matriz() -> Coordinate {
    Coordinate::new(-23.5503, -46.6339)
}

fn far_away() -> Coordinate {
    Coordinate::new(-23.5614, -46.6559)
}

async fn harness_with_sites(sites: &[(&str, Option<Coordinate>, Option<f64>)]) -> (TestHarness, Vec<i64>) {
    let h = TestHarness::builder().with_geofence(true).build().await.unwrap();
    let mut ids = Vec::new();
    for (name, location, radius) in sites {
        ids.push(h.add_site(name, *location, *radius).await.unwrap());
    }
    h.add_contact(ContactEntry {
        address: "5511911112222".into(),
        name: "Joana".into(),
        can_register_punch: Some(true),
        user_id: Some(USER_ID),
        site_ids: ids.clone(),
        ..Default::default()
    })
    .await
    .unwrap();
    (h, ids)
}

async fn punches_today(h: &TestHarness) -> Vec<PunchRecord> {
    let now = h.now().await;
    h.store
        .punches_between(USER_ID, now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap()
}

#[tokio::test]
async fn entry_then_exit_at_the_same_site() {
    let (h, _) = harness_with_sites(&[("Matriz", Some(matriz()), Some(150.0))]).await;

    let r = h.send(WORKER, "ponto").await;
    assert!(r[0].contains("*localização*"));
    assert!(h.sessions.get(WORKER).is_none());
    assert!(matches!(
        h.sessions.pending(WORKER),
        Some(PendingInput::AwaitingLocation(_))
    ));

    let r = h.send_location(WORKER, matriz()).await;
    assert_eq!(r, vec!["Entrada registrada às 10:00 em *Matriz*.".to_string()]);
    assert!(h.sessions.pending(WORKER).is_none());

    h.advance_clock(Duration::hours(8)).await;
    h.send(WORKER, "ponto").await;
    let r = h.send_location(WORKER, matriz()).await;
    assert_eq!(r, vec!["Saída registrada às 18:00 em *Matriz*.".to_string()]);

    let punches = punches_today(&h).await;
    assert_eq!(punches.len(), 2);
    assert_eq!(punches[0].direction, PunchDirection::Entry);
    assert_eq!(punches[1].direction, PunchDirection::Exit);
    assert!(punches.iter().all(|p| !p.automatic));
    assert!(punches[0].distance_m.is_some_and(|d| d < 1.0));
}

#[tokio::test]
async fn location_outside_the_geofence_is_rejected_and_stays_pending() {
    let (h, _) = harness_with_sites(&[("Matriz", Some(matriz()), Some(100.0))]).await;
    h.send(WORKER, "ponto").await;

    let r = h.send_location(WORKER, far_away()).await;

    assert!(r[0].contains("máximo permitido: 100 m"), "got {r:?}");
    assert!(h.sessions.pending(WORKER).is_some());
    assert!(punches_today(&h).await.is_empty());

    let r = h.send_location(WORKER, matriz()).await;
    assert!(r[0].starts_with("Entrada registrada"));
    assert!(h.sessions.pending(WORKER).is_none());
}

#[tokio::test]
async fn geofence_can_be_disabled() {
    let h = TestHarness::builder().with_geofence(false).build().await.unwrap();
    let site = h.add_site("Matriz", Some(matriz()), Some(100.0)).await.unwrap();
    h.add_contact(ContactEntry {
        address: "5511911112222".into(),
        can_register_punch: Some(true),
        user_id: Some(USER_ID),
        site_ids: vec![site],
        ..Default::default()
    })
    .await
    .unwrap();
    h.send(WORKER, "ponto").await;

    let r = h.send_location(WORKER, far_away()).await;

    assert!(r[0].starts_with("Entrada registrada"));
}

#[tokio::test]
async fn entry_at_another_site_closes_the_open_one() {
    let (h, ids) = harness_with_sites(&[("Matriz", None, None), ("Filial", None, None)]).await;

    let r = h.send(WORKER, "ponto").await;
    assert!(r[0].contains("1 - Matriz"));
    assert!(r[0].contains("2 - Filial"));
    h.send(WORKER, "1").await;
    h.send_location(WORKER, matriz()).await;

    h.advance_clock(Duration::hours(2)).await;
    h.send(WORKER, "ponto").await;
    h.send(WORKER, "2").await;
    let r = h.send_location(WORKER, far_away()).await;

    assert_eq!(
        r,
        vec![
            "Saída automática registrada em *Matriz*.".to_string(),
            "Entrada registrada às 12:00 em *Filial*.".to_string(),
        ]
    );
    let punches = punches_today(&h).await;
    assert_eq!(punches.len(), 3);
    assert_eq!(punches[1].site_id, ids[0]);
    assert_eq!(punches[1].direction, PunchDirection::Exit);
    assert!(punches[1].automatic);
    assert_eq!(punches[2].site_id, ids[1]);
    assert_eq!(punches[2].direction, PunchDirection::Entry);
}

#[tokio::test]
async fn text_while_waiting_for_location_reprompts() {
    let (h, _) = harness_with_sites(&[("Matriz", None, None)]).await;
    h.send(WORKER, "ponto").await;

    let r = h.send(WORKER, "já cheguei").await;

    assert_eq!(r, vec![copy::LOCATION_REPROMPT.to_string()]);
    assert!(h.sessions.pending(WORKER).is_some());
}

#[tokio::test]
async fn maps_link_counts_as_a_location() {
    let (h, _) = harness_with_sites(&[("Matriz", Some(matriz()), Some(150.0))]).await;
    h.send(WORKER, "ponto").await;

    let r = h
        .send(WORKER, "https://maps.google.com/?q=-23.5503,-46.6339")
        .await;

    assert!(r[0].starts_with("Entrada registrada"), "got {r:?}");
}

#[tokio::test]
async fn location_without_pending_input_is_ignored_as_a_punch() {
    let (h, _) = harness_with_sites(&[("Matriz", None, None)]).await;

    let r = h.send_location(WORKER, matriz()).await;

    assert!(r[0].contains("*ponto*"));
    assert!(punches_today(&h).await.is_empty());
}

#[tokio::test]
async fn cancel_drops_the_pending_location() {
    let (h, _) = harness_with_sites(&[("Matriz", None, None)]).await;
    h.send(WORKER, "ponto").await;

    let r = h.send(WORKER, "cancelar").await;

    assert_eq!(r, vec![copy::CANCELLED.to_string()]);
    assert!(h.sessions.pending(WORKER).is_none());
}

#[tokio::test]
async fn contact_without_sites_is_denied() {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact(ContactEntry {
        address: "5511911112222".into(),
        can_register_punch: Some(true),
        user_id: Some(USER_ID),
        ..Default::default()
    })
    .await
    .unwrap();

    let r = h.send(WORKER, "ponto").await;

    assert_eq!(
        r,
        vec![copy::denial(fieldops_agent::DenialReason::MissingCapability).to_string()]
    );
}
