// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing precedence, authorization and session lifecycle.

use chrono::{Duration, NaiveDate};
use fieldops_agent::copy;
use fieldops_agent::dialog::{Dialog, DialogKind};
use fieldops_agent::sweep::sweep_once;
use fieldops_core::types::{ContactEntry, InboundMessage};
use fieldops_test_utils::{MockTransport, TestHarness};

const TECH: &str = "5511987654321@c.us";

async fn harness_with_technician() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_technician("+55 11 98765-4321", "T7").await.unwrap();
    h.erp.add_client("C001", "ACME").await;
    h
}

fn step(h: &TestHarness, sender: &str) -> Option<(DialogKind, &'static str)> {
    h.sessions
        .get(sender)
        .map(|s| (s.dialog.kind(), s.dialog.step_name()))
}

#[tokio::test]
async fn closure_keyword_mid_creation_is_forwarded_to_creation() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;
    h.send(TECH, "C001").await;
    h.send(TECH, "printer jam").await;
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_priority")));

    let replies = h.send(TECH, "fechar chamado").await;

    assert!(replies[0].contains("Opção inválida"), "got {replies:?}");
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_priority")));
}

#[tokio::test]
async fn keyword_at_initial_step_supersedes_the_session() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_client")));

    let replies = h.send(TECH, "fechar chamado").await;

    assert!(replies[0].contains("Como deseja localizar"));
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketClose, "await_mode")));
    assert_eq!(h.sessions.len(), 1);
}

#[tokio::test]
async fn keyword_at_confirmation_supersedes_the_session() {
    let h = harness_with_technician().await;
    for text in ["abrir chamado", "C001", "printer jam", "2"] {
        h.send(TECH, text).await;
    }
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_confirmation")));

    h.send(TECH, "intervenção").await;

    assert_eq!(step(&h, TECH), Some((DialogKind::Intervention, "await_client")));
}

#[tokio::test]
async fn intervention_continues_regardless_of_keywords() {
    let h = harness_with_technician().await;
    h.erp.add_open_ticket("T1", "C001", "impressora", Some("T7")).await;
    for text in ["intervenção", "C001", "1"] {
        h.send(TECH, text).await;
    }
    assert_eq!(step(&h, TECH), Some((DialogKind::Intervention, "await_outcome_state")));

    let replies = h.send(TECH, "abrir chamado").await;

    assert!(replies[0].contains("Resposta inválida"));
    assert_eq!(step(&h, TECH), Some((DialogKind::Intervention, "await_outcome_state")));

    // The engine itself honours cancel.
    let replies = h.send(TECH, "cancelar").await;
    assert_eq!(replies, vec![copy::CANCELLED.to_string()]);
    assert!(h.sessions.get(TECH).is_none());
}

#[tokio::test]
async fn cancel_destroys_the_session() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;
    h.send(TECH, "C001").await;

    let replies = h.send(TECH, "Cancelar").await;

    assert_eq!(replies, vec![copy::CANCELLED.to_string()]);
    assert!(h.sessions.get(TECH).is_none());
}

#[tokio::test]
async fn cancel_with_nothing_to_cancel_gets_help() {
    let h = harness_with_technician().await;

    let replies = h.send(TECH, "cancelar").await;

    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("abrir chamado"));
}

#[tokio::test]
async fn help_is_scoped_to_capabilities() {
    let h = TestHarness::builder().build().await.unwrap();
    let site = h.add_site("Matriz", None, None).await.unwrap();
    h.add_contact(ContactEntry {
        address: "5511900000001".into(),
        can_register_punch: Some(true),
        user_id: Some(7),
        site_ids: vec![site],
        ..Default::default()
    })
    .await
    .unwrap();
    h.add_technician("5511900000002", "T2").await.unwrap();

    let punch_only = h.send("5511900000001", "oi").await;
    assert!(punch_only[0].contains("*ponto*"));
    assert!(!punch_only[0].contains("chamado"));

    let tickets_only = h.send("5511900000002", "bom dia").await;
    assert!(tickets_only[0].contains("abrir chamado"));
    assert!(!tickets_only[0].contains("*ponto*"));

    // Unknown senders get silence for chatter.
    assert!(h.send("5511900000099", "oi").await.is_empty());
}

#[tokio::test]
async fn unknown_sender_is_denied_on_keyword() {
    let h = TestHarness::builder().build().await.unwrap();

    let replies = h.send("5521912345678", "abrir chamado").await;

    assert_eq!(
        replies,
        vec![copy::denial(fieldops_agent::DenialReason::UnknownSender).to_string()]
    );
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn denial_leaves_the_existing_session_untouched() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;

    // The technician may not register punches.
    let replies = h.send(TECH, "ponto").await;

    assert_eq!(
        replies,
        vec![copy::denial(fieldops_agent::DenialReason::MissingCapability).to_string()]
    );
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_client")));
}

#[tokio::test]
async fn validity_window_uses_the_local_date() {
    let h = TestHarness::builder().build().await.unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    h.add_contact(ContactEntry {
        address: "5511900000003".into(),
        can_create_tickets: Some(true),
        valid_until: today.pred_opt(),
        ..Default::default()
    })
    .await
    .unwrap();
    h.add_contact(ContactEntry {
        address: "5511900000004".into(),
        can_create_tickets: Some(true),
        valid_from: today.succ_opt(),
        ..Default::default()
    })
    .await
    .unwrap();

    let expired = h.send("5511900000003", "abrir chamado").await;
    assert_eq!(expired, vec![copy::denial(fieldops_agent::DenialReason::Expired).to_string()]);

    let early = h.send("5511900000004", "abrir chamado").await;
    assert_eq!(early, vec![copy::denial(fieldops_agent::DenialReason::NotYetValid).to_string()]);
}

#[tokio::test]
async fn sweep_evicts_idle_sessions_and_notifies() {
    let h = harness_with_technician().await;
    let transport = MockTransport::new();
    h.send(TECH, "abrir chamado").await;
    h.send(TECH, "C001").await;

    let start = h.now().await;
    assert_eq!(sweep_once(&h.sessions, &transport, start + Duration::minutes(29)).await, 0);
    assert_eq!(sweep_once(&h.sessions, &transport, start + Duration::minutes(31)).await, 1);

    assert_eq!(transport.sent_to(TECH).await, vec![copy::SESSION_EXPIRED.to_string()]);
    assert!(h.sessions.get(TECH).is_none());

    // Absent from routing: the next text gets help instead of the problem step.
    h.advance_clock(Duration::minutes(31)).await;
    let replies = h.send(TECH, "printer jam").await;
    assert!(replies[0].contains("Posso ajudar"));
}

#[tokio::test]
async fn one_session_per_sender() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;
    h.send(TECH, "fechar chamado").await;
    h.send(TECH, "intervenção").await;

    assert_eq!(h.sessions.len(), 1);
    assert!(matches!(
        h.sessions.get(TECH).map(|s| s.dialog),
        Some(Dialog::Intervention(_))
    ));
}

#[tokio::test]
async fn cancel_word_inside_an_answer_does_not_cancel() {
    let h = harness_with_technician().await;
    h.send(TECH, "abrir chamado").await;
    h.send(TECH, "C001").await;

    let replies = h.send(TECH, "usuario nao consegue sair do sistema").await;

    assert_ne!(replies, vec![copy::CANCELLED.to_string()]);
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_priority")));
}

#[tokio::test]
async fn late_delivered_message_is_stamped_at_processing_time() {
    let h = harness_with_technician().await;
    let now = h.now().await;
    let mut msg = InboundMessage::text("late-1", TECH, "abrir chamado");
    msg.received_at = now - Duration::minutes(40);

    h.deliver(msg).await;

    let session = h.sessions.get(TECH).unwrap();
    assert_eq!(session.last_activity, now);
    let transport = MockTransport::new();
    assert_eq!(sweep_once(&h.sessions, &transport, now).await, 0);
    assert_eq!(step(&h, TECH), Some((DialogKind::TicketCreate, "await_client")));
}
