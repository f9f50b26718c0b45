// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Fieldops pipeline.
//!
//! Messages enter through the gateway webhook, flow through the bridge
//! transport, the outbox and the agent loop into the router, and replies
//! leave as `POST /send` calls against a mock bridge. Each test builds its
//! own TestHarness and mock server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fieldops_agent::{AgentLoop, Outbox, OutboxPolicy};
use fieldops_bridge::BridgeTransport;
use fieldops_config::model::BridgeConfig;
use fieldops_core::{MessagingTransport, PluginAdapter};
use fieldops_cron::{ExecutionLog, Executors, Scheduler, SchedulerSettings};
use fieldops_gateway::{build_router, AuthConfig, GatewayState};
use fieldops_test_utils::TestHarness;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "e2e-token";
const TECHNICIAN: &str = "5511987654321";

struct Pipeline {
    harness: TestHarness,
    bridge_server: MockServer,
    app: axum::Router,
    cancel: CancellationToken,
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn pipeline() -> Pipeline {
    let bridge_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ready": true,
            "state": "CONNECTED"
        })))
        .mount(&bridge_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&bridge_server)
        .await;

    let harness = TestHarness::builder().build().await.unwrap();
    let bridge_config = BridgeConfig {
        base_url: bridge_server.uri(),
        ready_backoff_ms: 10,
        ..Default::default()
    };
    let bridge = Arc::new(BridgeTransport::new(&bridge_config).unwrap());
    let cancel = CancellationToken::new();
    let tasks = TaskTracker::new();
    let outbox: Arc<dyn MessagingTransport> = Arc::new(Outbox::spawn(
        bridge.clone(),
        OutboxPolicy::from(&bridge_config),
        &tasks,
    ));

    let log = Arc::new(ExecutionLog::new(20));
    let scheduler = Scheduler::new(
        harness.store.clone(),
        Executors::new(outbox.clone(), harness.store.clone(), harness.store.clone(), None),
        log.clone(),
        harness.router.timezone(),
        SchedulerSettings {
            tick: Duration::from_secs(60),
            min_interval: Duration::from_secs(180),
            send_delay: Duration::ZERO,
            exit_tolerance_minutes: 15,
        },
    );

    let agent = AgentLoop::new(
        harness.router.clone(),
        outbox,
        Duration::from_secs(60),
        cancel.clone(),
    );
    let loop_cancel = cancel.clone();
    tokio::spawn(async move { agent.run(loop_cancel).await });

    let state = GatewayState {
        jobs: harness.store.clone(),
        contacts: harness.store.clone(),
        scheduler: Some(scheduler),
        log,
        sessions: harness.sessions.clone(),
        inbound_tx: Some(bridge.inbound_sender()),
        adapters: vec![bridge as Arc<dyn PluginAdapter>],
        start_time: Instant::now(),
        auth: AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
    };

    Pipeline {
        harness,
        bridge_server,
        app: build_router(state),
        cancel,
    }
}

impl Pipeline {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"));
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Post a text event from the bridge webhook.
    async fn inbound(&self, from: &str, text: &str) {
        let (status, body) = self
            .call(
                "POST",
                "/v1/inbound",
                Some(json!({"from": format!("{from}@c.us"), "body": text, "fromMe": false})),
            )
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "accepted");
    }

    /// Every `/send` body the mock bridge received, in order.
    async fn sent(&self) -> Vec<Value> {
        self.bridge_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/send")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    /// Wait until the mock bridge received `count` sends.
    async fn wait_for_sent(&self, count: usize) -> Vec<Value> {
        for _ in 0..250 {
            let sent = self.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} sends, got {:?}", self.sent().await);
    }
}

#[tokio::test]
async fn unknown_sender_is_denied_through_the_bridge() {
    let p = pipeline().await;
    p.inbound("5511911112222", "abrir chamado").await;

    let sent = p.wait_for_sent(1).await;
    assert_eq!(sent[0]["to"], "5511911112222@c.us");
    assert!(sent[0]["text"].as_str().unwrap().contains("não está cadastrado"));
}

#[tokio::test]
async fn technician_opens_then_cancels_a_ticket_flow() {
    let p = pipeline().await;
    p.harness.add_technician(TECHNICIAN, "T1").await.unwrap();

    p.inbound(TECHNICIAN, "abrir chamado").await;
    let sent = p.wait_for_sent(1).await;
    assert!(sent[0]["text"].as_str().unwrap().contains("código do cliente"));

    let (status, sessions) = p.call("GET", "/v1/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 1);

    p.inbound(TECHNICIAN, "cancelar").await;
    let sent = p.wait_for_sent(2).await;
    assert_eq!(sent[1]["text"], "Operação cancelada.");
    assert_eq!(sent[1]["to"], format!("{TECHNICIAN}@c.us"));
    assert!(p.harness.sessions.get(&format!("{TECHNICIAN}@c.us")).is_none());
}

#[tokio::test]
async fn full_ticket_creation_reaches_the_erp() {
    let p = pipeline().await;
    p.harness.add_technician(TECHNICIAN, "T1").await.unwrap();
    p.harness.erp.add_client("C001", "Padaria Central").await;

    p.inbound(TECHNICIAN, "abrir chamado").await;
    p.wait_for_sent(1).await;
    p.inbound(TECHNICIAN, "C001").await;
    p.wait_for_sent(2).await;
    p.inbound(TECHNICIAN, "Impressora fiscal não liga").await;
    p.wait_for_sent(3).await;
    p.inbound(TECHNICIAN, "1").await;
    p.wait_for_sent(4).await;
    p.inbound(TECHNICIAN, "sim").await;
    p.wait_for_sent(5).await;

    let created = p.harness.erp.created_tickets().await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].client_code, "C001");
}

#[tokio::test]
async fn group_messages_never_reach_the_router() {
    let p = pipeline().await;
    let (status, body) = p
        .call(
            "POST",
            "/v1/inbound",
            Some(json!({"from": "120363025@g.us", "body": "abrir chamado"})),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "ignored");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(p.sent().await.is_empty());
}

#[tokio::test]
async fn manual_broadcast_goes_out_through_the_outbox() {
    let p = pipeline().await;
    let (status, job) = p
        .call(
            "POST",
            "/v1/jobs",
            Some(json!({
                "name": "aviso",
                "message": "Reunião às 14h",
                "recipients": ["5511900000001", "5511900000002"],
                "frequency": "daily",
                "hour": 8,
                "minute": 0,
                "kind": "broadcast"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = job["id"].as_i64().unwrap();

    let (status, _) = p.call("POST", &format!("/v1/jobs/{id}/run"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let sent = p.wait_for_sent(2).await;
    let recipients: Vec<&str> = sent.iter().map(|s| s["to"].as_str().unwrap()).collect();
    assert!(recipients.contains(&"5511900000001"));
    assert!(recipients.contains(&"5511900000002"));
    assert!(sent.iter().all(|s| s["text"] == "Reunião às 14h"));
}
