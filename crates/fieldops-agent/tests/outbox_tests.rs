// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox readiness, reconnect and ordering behaviour.

use std::sync::Arc;
use std::time::Duration;

use fieldops_agent::{Outbox, OutboxPolicy};
use fieldops_core::types::HealthStatus;
use fieldops_core::{FieldopsError, MessagingTransport, PluginAdapter};
use fieldops_test_utils::MockTransport;
use tokio_util::task::TaskTracker;

fn policy() -> OutboxPolicy {
    OutboxPolicy {
        ready_retries: 3,
        ready_backoff: Duration::from_millis(100),
        reconnect_max_backoff: Duration::from_secs(1),
    }
}

fn outbox(inner: &Arc<MockTransport>) -> (Outbox, TaskTracker) {
    let tracker = TaskTracker::new();
    (Outbox::spawn(inner.clone(), policy(), &tracker), tracker)
}

#[tokio::test(start_paused = true)]
async fn waits_for_readiness_before_sending() {
    let inner = Arc::new(MockTransport::new());
    inner.not_ready_for(2);
    let (outbox, _tracker) = outbox(&inner);

    outbox.send_text("5511900000001", "olá").await.unwrap();

    assert_eq!(inner.ready_polls(), 3);
    assert_eq!(inner.sent_to("5511900000001").await, vec!["olá".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn gives_up_when_transport_never_becomes_ready() {
    let inner = Arc::new(MockTransport::new());
    inner.set_ready(false);
    let (outbox, _tracker) = outbox(&inner);

    let err = outbox.send_text("5511900000001", "olá").await.unwrap_err();

    assert!(matches!(err, FieldopsError::TransportNotReady));
    assert_eq!(inner.ready_polls(), 4);
    assert_eq!(inner.sent_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_reconnects_and_retries_once() {
    let inner = Arc::new(MockTransport::new());
    inner.fail_next_send(true).await;
    let (outbox, _tracker) = outbox(&inner);

    outbox.send_text("5511900000001", "olá").await.unwrap();

    assert_eq!(inner.reconnect_count(), 1);
    assert_eq!(inner.sent_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn second_transient_failure_is_reported() {
    let inner = Arc::new(MockTransport::new());
    inner.fail_next_send(true).await;
    inner.fail_next_send(true).await;
    let (outbox, _tracker) = outbox(&inner);

    let err = outbox.send_text("5511900000001", "olá").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(inner.reconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_does_not_reconnect() {
    let inner = Arc::new(MockTransport::new());
    inner.fail_next_send(false).await;
    let (outbox, _tracker) = outbox(&inner);

    let err = outbox.send_text("5511900000001", "olá").await.unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(inner.reconnect_count(), 0);
    assert_eq!(inner.sent_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_senders_share_one_writer() {
    let inner = Arc::new(MockTransport::new());
    let (outbox, _tracker) = outbox(&inner);
    let outbox = Arc::new(outbox);

    let mut handles = Vec::new();
    for sender in ["a", "b", "c"] {
        let outbox = outbox.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                outbox.send_text(sender, &format!("{sender}{i}")).await.unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(inner.sent_count().await, 15);
    let expected: Vec<String> = (0..5).map(|i| format!("b{i}")).collect();
    assert_eq!(inner.sent_to("b").await, expected);
}

#[tokio::test]
async fn writer_drains_the_queue_after_the_last_handle_drops() {
    let inner = Arc::new(MockTransport::new());
    let (outbox, tracker) = outbox(&inner);
    assert_eq!(outbox.health_check().await.unwrap(), HealthStatus::Healthy);
    let outbox = Arc::new(outbox);

    let sender = {
        let outbox = outbox.clone();
        tokio::spawn(async move {
            for i in 0..3 {
                outbox.send_text("a", &format!("m{i}")).await.unwrap();
            }
        })
    };
    drop(outbox);
    sender.await.unwrap();

    tracker.close();
    tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .expect("writer did not stop");
    assert_eq!(inner.sent_to("a").await, vec!["m0", "m1", "m2"]);
}
