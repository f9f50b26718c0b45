// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end ticket and intervention conversations through the router.

use chrono::NaiveDate;
use fieldops_agent::dialog::DialogKind;
use fieldops_core::erp::{InterventionOutcome, ServiceMode};
use fieldops_test_utils::TestHarness;

const TECH: &str = "5511987654321@c.us";

async fn harness() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_technician("5511987654321", "T7").await.unwrap();
    h.erp.add_client("C001", "ACME").await;
    h
}

fn step_name(h: &TestHarness) -> Option<&'static str> {
    h.sessions.get(TECH).map(|s| s.dialog.step_name())
}

#[tokio::test]
async fn ticket_creation_end_to_end() {
    let h = harness().await;

    let r = h.send(TECH, "abrir chamado").await;
    assert!(r[0].contains("código do cliente"));

    let r = h.send(TECH, "C001").await;
    assert!(r[0].contains("ACME"));
    assert!(r[0].contains("Descreva o problema"));

    let r = h.send(TECH, "printer jam").await;
    assert!(r[0].contains("prioridade"));

    let r = h.send(TECH, "2").await;
    assert!(r[0].contains("printer jam"));
    assert!(r[0].contains("Média"));

    let r = h.send(TECH, "sim").await;
    assert!(r[0].contains("sucesso"), "got {r:?}");

    let created = h.erp.created_tickets().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].client_code, "C001");
    assert_eq!(created[0].problem, "printer jam");
    assert_eq!(created[0].priority, "2");
    assert_eq!(created[0].contract_id, None);
    assert_eq!(created[0].requester.as_deref(), Some("Técnico"));
    assert!(h.sessions.get(TECH).is_none());
}

#[tokio::test]
async fn several_contracts_show_a_pick_list_with_hours() {
    let h = harness().await;
    h.erp.add_contract("C001", "K1", "Suporte mensal", Some(12.5)).await;
    h.erp.add_contract("C001", "K2", "Impressoras", None).await;

    h.send(TECH, "abrir chamado").await;
    let r = h.send(TECH, "C001").await;
    assert!(r[0].contains("1 - Suporte mensal (12.5 h disponíveis)"));
    assert!(r[0].contains("2 - Impressoras"));
    assert_eq!(step_name(&h), Some("await_contract"));

    let r = h.send(TECH, "7").await;
    assert!(r[0].contains("Opção inválida"));

    h.send(TECH, "2").await;
    h.send(TECH, "toner vazando").await;
    h.send(TECH, "4").await;
    h.send(TECH, "s").await;

    let created = h.erp.created_tickets().await;
    assert_eq!(created[0].contract_id.as_deref(), Some("K2"));
    assert_eq!(created[0].priority, "4");
}

#[tokio::test]
async fn single_contract_is_chosen_silently() {
    let h = harness().await;
    h.erp.add_contract("C001", "K1", "Suporte mensal", Some(3.0)).await;

    h.send(TECH, "abrir chamado").await;
    let r = h.send(TECH, "C001").await;

    assert!(r[0].contains("Contrato: Suporte mensal (3.0 h disponíveis)"));
    assert_eq!(step_name(&h), Some("await_problem"));
}

#[tokio::test]
async fn unknown_client_reprompts() {
    let h = harness().await;
    h.send(TECH, "abrir chamado").await;

    let r = h.send(TECH, "C999").await;

    assert!(r[0].contains("não encontrado"));
    assert_eq!(step_name(&h), Some("await_client"));
}

#[tokio::test]
async fn declining_confirmation_discards_the_ticket() {
    let h = harness().await;
    for text in ["abrir chamado", "C001", "printer jam", "1"] {
        h.send(TECH, text).await;
    }

    let r = h.send(TECH, "não").await;

    assert_eq!(r, vec![fieldops_agent::copy::CANCELLED.to_string()]);
    assert!(h.erp.created_tickets().await.is_empty());
}

#[tokio::test]
async fn ticket_closure_pages_through_open_tickets() {
    let h = harness().await;
    for i in 1..=12 {
        h.erp
            .add_open_ticket(&format!("T{i}"), "C001", &format!("problema {i}"), Some("T7"))
            .await;
    }
    h.erp.add_open_ticket("X1", "C002", "outro técnico", Some("T9")).await;

    h.send(TECH, "fechar chamado").await;
    let r = h.send(TECH, "2").await;
    assert!(r[0].contains("página 1 de 2"));
    assert!(r[0].contains("#T10"));
    assert!(!r[0].contains("#T11"));
    assert!(!r[0].contains("#X1"));

    let r = h.send(TECH, "mais").await;
    assert!(r[0].contains("página 2 de 2"));
    assert!(r[0].contains("1 - #T11"));

    let r = h.send(TECH, "mais").await;
    assert!(r[0].contains("Não há mais chamados"));

    // Index is relative to the page on screen.
    let r = h.send(TECH, "2").await;
    assert!(r[0].contains("#T12"));

    let r = h.send(TECH, "sim").await;
    assert!(r[0].contains("encerrado"));
    assert_eq!(
        h.erp.closed_tickets().await,
        vec![("T12".to_string(), Some("T7".to_string()))]
    );
}

#[tokio::test]
async fn closure_by_client_asks_for_the_code_without_linked_client() {
    let h = harness().await;
    h.erp.add_open_ticket("T1", "C001", "impressora", None).await;

    h.send(TECH, "fechar chamado").await;
    let r = h.send(TECH, "1").await;
    assert!(r[0].contains("código do cliente"));
    assert_eq!(step_name(&h), Some("await_client_code"));

    let r = h.send(TECH, "C001").await;
    assert!(r[0].contains("#T1"));
}

#[tokio::test]
async fn closure_with_no_open_tickets_finishes() {
    let h = harness().await;
    h.send(TECH, "fechar chamado").await;

    let r = h.send(TECH, "2").await;

    assert!(r[0].contains("Nenhum chamado aberto"));
    assert!(h.sessions.get(TECH).is_none());
}

#[tokio::test]
async fn intervention_with_parts_and_end_time_check() {
    let h = harness().await;
    h.erp.add_open_ticket("T1", "C001", "impressora travando", Some("T7")).await;
    h.erp.add_part("P-100", "Rolo fusor").await;

    for text in ["intervenção", "C001", "1", "2", "2", "troca do rolo fusor", "sim"] {
        h.send(TECH, text).await;
    }
    assert_eq!(step_name(&h), Some("await_scan"));

    // Unknown code keeps the loop going.
    let r = h.send(TECH, "XYZ").await;
    assert!(r[0].contains("não encontrada"));
    assert_eq!(step_name(&h), Some("await_scan"));

    let r = h.send(TECH, "P-100").await;
    assert!(r[0].contains("Rolo fusor"));
    let r = h.send(TECH, "abc").await;
    assert!(r[0].contains("Resposta inválida"));
    h.send(TECH, "2").await;
    assert_eq!(step_name(&h), Some("await_more_parts"));
    h.send(TECH, "não").await;

    h.send(TECH, "hoje").await;
    h.send(TECH, "10:00").await;
    h.send(TECH, "hoje").await;

    let r = h.send(TECH, "09:30").await;
    assert!(r[0].contains("depois do início"));
    assert_eq!(step_name(&h), Some("await_end_time"));

    let r = h.send(TECH, "10h30").await;
    assert!(r[0].contains("Duração: 30 min"), "got {r:?}");
    assert!(r[0].contains("2 x Rolo fusor"));
    assert_eq!(step_name(&h), Some("await_confirmation"));

    let r = h.send(TECH, "sim").await;
    assert!(r[0].contains("Atendimento registrado"));

    let recorded = h.erp.interventions().await;
    assert_eq!(recorded.len(), 1);
    let i = &recorded[0];
    assert_eq!(i.ticket_id, "T1");
    assert_eq!(i.technician_id.as_deref(), Some("T7"));
    assert_eq!(i.outcome, InterventionOutcome::Resolved);
    assert_eq!(i.mode, ServiceMode::Onsite);
    assert_eq!(i.parts.len(), 1);
    assert_eq!(i.parts[0].quantity, 2.0);
    let day = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    assert_eq!(i.started_at, day.and_hms_opt(10, 0, 0).unwrap());
    assert_eq!(i.ended_at, day.and_hms_opt(10, 30, 0).unwrap());
    assert!(h.sessions.get(TECH).is_none());
}

#[tokio::test]
async fn intervention_without_parts_skips_the_loop() {
    let h = harness().await;
    h.erp.add_open_ticket("T1", "C001", "rede", Some("T7")).await;

    for text in ["intervenção", "C001", "1", "1", "1", "ajuste remoto", "não"] {
        h.send(TECH, text).await;
    }

    assert_eq!(step_name(&h), Some("await_start_date"));
    assert_eq!(
        h.sessions.get(TECH).map(|s| s.dialog.kind()),
        Some(DialogKind::Intervention)
    );
}

#[tokio::test]
async fn erp_outage_mid_flow_keeps_the_step() {
    let h = harness().await;
    h.send(TECH, "abrir chamado").await;
    h.erp.fail_lookups(true).await;

    let r = h.send(TECH, "C001").await;

    assert_eq!(r, vec![fieldops_agent::copy::APOLOGY.to_string()]);
    assert_eq!(step_name(&h), Some("await_client"));
}

#[tokio::test]
async fn problem_text_mentioning_a_cancel_word_is_kept() {
    let h = harness().await;
    for text in ["abrir chamado", "C001"] {
        h.send(TECH, text).await;
    }
    assert_eq!(step_name(&h), Some("await_problem"));

    h.send(TECH, "usuario nao consegue sair do sistema").await;
    assert_eq!(step_name(&h), Some("await_priority"));

    for text in ["2", "sim"] {
        h.send(TECH, text).await;
    }
    let created = h.erp.created_tickets().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].problem, "usuario nao consegue sair do sistema");
}

#[tokio::test]
async fn intervention_description_mentioning_a_cancel_word_is_kept() {
    let h = harness().await;
    h.erp.add_open_ticket("T1", "C001", "servidor", Some("T7")).await;
    for text in ["intervenção", "C001", "1", "1", "1"] {
        h.send(TECH, text).await;
    }
    assert_eq!(step_name(&h), Some("await_description"));

    h.send(TECH, "precisei parar o servidor").await;

    assert_eq!(step_name(&h), Some("await_parts_decision"));
}
