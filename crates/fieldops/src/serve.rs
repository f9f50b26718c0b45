// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldops serve` command implementation.
//!
//! Wires SQLite storage, the ERP client, the bridge transport behind the
//! serialized outbox, the conversation router, the session sweeper, the
//! scheduler and the admin gateway, then runs the agent loop until SIGINT or
//! SIGTERM.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fieldops_agent::shutdown;
use fieldops_agent::sweep::run_sweeper;
use fieldops_agent::{AgentLoop, Collaborators, Outbox, OutboxPolicy, Router, SessionStore};
use fieldops_bridge::BridgeTransport;
use fieldops_config::model::FieldopsConfig;
use fieldops_core::time::parse_timezone;
use fieldops_core::{EmailSender, FieldopsError, MessagingTransport, PluginAdapter};
use fieldops_cron::{ExecutionLog, Executors, Scheduler, SchedulerSettings};
use fieldops_email::SmtpEmailSender;
use fieldops_erp::HttpErpClient;
use fieldops_gateway::{start_server, AuthConfig, GatewayState};
use fieldops_storage::SqliteStore;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Upper bound on waiting for background tasks after the agent loop stops.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `fieldops serve` command.
pub async fn run_serve(config: FieldopsConfig) -> Result<(), FieldopsError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, timezone = %config.agent.timezone, "starting fieldops serve");
    let tz = parse_timezone(&config.agent.timezone)?;

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let erp = Arc::new(HttpErpClient::new(&config.erp)?);
    let bridge = Arc::new(BridgeTransport::new(&config.bridge)?);
    let email = SmtpEmailSender::from_config(&config.email)?.map(Arc::new);
    if email.is_none() {
        info!("email not configured, emailed-report jobs will fail");
    }

    let cancel = shutdown::install_signal_handler();

    let tasks = TaskTracker::new();

    // The writer outlives the shutdown token: it stops once every handle
    // below is dropped, so replies produced while draining still go out.
    let outbox: Arc<dyn MessagingTransport> = Arc::new(Outbox::spawn(
        bridge.clone(),
        OutboxPolicy::from(&config.bridge),
        &tasks,
    ));

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.agent.session_ttl_secs,
    )));
    let router = Arc::new(Router::new(
        &config,
        Collaborators {
            contacts: store.clone(),
            punches: store.clone(),
            erp: erp.clone(),
        },
        sessions.clone(),
    )?);

    let log = Arc::new(ExecutionLog::new(config.scheduler.log_capacity));
    let mut scheduler = if config.scheduler.enabled {
        let executors = Executors::new(
            outbox.clone(),
            store.clone(),
            store.clone(),
            email.clone().map(|e| e as Arc<dyn EmailSender>),
        );
        Some(Scheduler::new(
            store.clone(),
            executors,
            log.clone(),
            tz,
            SchedulerSettings::from(&config.scheduler),
        ))
    } else {
        info!("scheduler disabled by configuration");
        None
    };

    tasks.spawn(run_sweeper(
        sessions.clone(),
        outbox.clone(),
        Duration::from_secs(config.agent.sweep_interval_secs.max(1)),
        cancel.clone(),
    ));

    if let Some(scheduler) = scheduler.clone() {
        let scheduler_cancel = cancel.clone();
        tasks.spawn(async move { scheduler.run(scheduler_cancel).await });
    }

    if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set; every /v1 request will be rejected");
        }
        let mut adapters: Vec<Arc<dyn PluginAdapter>> = vec![
            bridge.clone() as Arc<dyn PluginAdapter>,
            erp.clone() as Arc<dyn PluginAdapter>,
        ];
        if let Some(email) = &email {
            adapters.push(email.clone());
        }
        let state = GatewayState {
            jobs: store.clone(),
            contacts: store.clone(),
            scheduler: scheduler.take(),
            log,
            sessions,
            inbound_tx: Some(bridge.inbound_sender()),
            adapters,
            start_time: Instant::now(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
        };
        let gateway_config = config.gateway.clone();
        let gateway_cancel = cancel.clone();
        tasks.spawn(async move {
            if let Err(e) = start_server(&gateway_config, state, gateway_cancel.clone()).await {
                error!(error = %e, "gateway failed, shutting down");
                gateway_cancel.cancel();
            }
        });
    } else {
        warn!("gateway disabled: inbound messages from the bridge webhook will not be accepted");
    }

    let agent_loop = AgentLoop::new(
        router,
        outbox,
        Duration::from_secs(config.agent.idle_worker_secs),
        cancel.clone(),
    );
    info!("fieldops ready");
    let result = agent_loop.run(cancel.clone()).await;
    drop(agent_loop);
    drop(scheduler);

    // The loop also ends when the inbound stream closes; stop everything else.
    cancel.cancel();
    tasks.close();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, tasks.wait()).await.is_err() {
        warn!(timeout_secs = SHUTDOWN_TIMEOUT.as_secs(), "background tasks did not stop in time");
    }

    let adapters: [Arc<dyn PluginAdapter>; 2] = [bridge, erp];
    for adapter in adapters {
        if let Err(e) = adapter.shutdown().await {
            warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
        }
    }

    info!("fieldops stopped");
    result
}

/// Initialize the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldops={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
