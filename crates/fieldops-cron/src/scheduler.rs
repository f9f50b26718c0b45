// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ticker and job dispatch.
//!
//! Each tick lists the jobs, evaluates their guards and spawns one task per
//! due job. An in-flight set keeps a job from re-entering its own executor.
//! After every run, successful or not, `last_run` and the run counter are
//! persisted together with the notified set.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashSet;
use fieldops_config::model::SchedulerConfig;
use fieldops_core::job::{Frequency, JobDefinition};
use fieldops_core::{FieldopsError, JobStore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::executors::{ExecContext, Executors};
use crate::guards::{evaluate, evaluate_manual, GuardPolicy, SkipReason, Verdict};
use crate::log::{ExecutionLog, Severity};

/// Timing knobs, usually built from [`SchedulerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub tick: Duration,
    pub min_interval: Duration,
    pub send_delay: Duration,
    pub exit_tolerance_minutes: u32,
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            tick: Duration::from_secs(config.tick_secs.max(1)),
            min_interval: Duration::from_secs(config.min_interval_secs),
            send_delay: Duration::from_millis(config.send_delay_ms),
            exit_tolerance_minutes: config.exit_tolerance_minutes,
        }
    }
}

/// Result of asking for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started,
    Skipped(SkipReason),
}

struct Inner {
    jobs: Arc<dyn JobStore>,
    executors: Executors,
    log: Arc<ExecutionLog>,
    in_flight: DashSet<i64>,
    tracker: TaskTracker,
    tz: Tz,
    settings: SchedulerSettings,
}

/// Removes the job from the in-flight set when the run ends, however it ends.
struct InFlightGuard {
    inner: Arc<Inner>,
    job_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.job_id);
    }
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        executors: Executors,
        log: Arc<ExecutionLog>,
        tz: Tz,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs,
                executors,
                log,
                in_flight: DashSet::new(),
                tracker: TaskTracker::new(),
                tz,
                settings,
            }),
        }
    }

    pub fn log(&self) -> &Arc<ExecutionLog> {
        &self.inner.log
    }

    fn policy(&self) -> GuardPolicy {
        GuardPolicy {
            min_interval: chrono::Duration::from_std(self.inner.settings.min_interval)
                .unwrap_or_else(|_| chrono::Duration::minutes(3)),
        }
    }

    /// Evaluate every job at `now` and spawn the due ones. Returns their ids.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<i64>, FieldopsError> {
        let jobs = self.inner.jobs.list_jobs().await?;
        let policy = self.policy();
        let mut started = Vec::new();
        for job in jobs {
            match evaluate(&job, now, self.inner.tz, &policy) {
                Verdict::Run => {
                    if self.spawn(job.clone(), now) == Dispatch::Started {
                        started.push(job.id);
                    }
                }
                Verdict::Skip(reason) => {
                    debug!(job_id = job.id, %reason, "job skipped");
                }
            }
        }
        Ok(started)
    }

    /// Dispatch one job outside the timetable. Only the minimum-interval and
    /// in-flight guards apply.
    pub async fn run_now(&self, job_id: i64, now: DateTime<Utc>) -> Result<Dispatch, FieldopsError> {
        let job = self
            .inner
            .jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| FieldopsError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            })?;
        match evaluate_manual(&job, now, &self.policy()) {
            Verdict::Run => {
                info!(job_id, "manual run requested");
                Ok(self.spawn(job, now))
            }
            Verdict::Skip(reason) => {
                debug!(job_id, %reason, "manual run skipped");
                Ok(Dispatch::Skipped(reason))
            }
        }
    }

    fn spawn(&self, job: JobDefinition, now: DateTime<Utc>) -> Dispatch {
        if !self.inner.in_flight.insert(job.id) {
            debug!(job_id = job.id, "job still running, not re-entering");
            return Dispatch::Skipped(SkipReason::InFlight);
        }
        let guard = InFlightGuard {
            inner: self.inner.clone(),
            job_id: job.id,
        };
        let inner = self.inner.clone();
        self.inner.tracker.spawn(async move {
            let _guard = guard;
            run_job(&inner, job, now).await;
        });
        Dispatch::Started
    }

    /// Wait until every spawned run has finished.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Tick every `settings.tick` until `cancel` fires, then wait for running jobs.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.inner.settings.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_secs = self.inner.settings.tick.as_secs(), "scheduler started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        error!(error = %e, "scheduler tick failed");
                        self.inner.log.push(None, Severity::Error, format!("tick failed: {e}"));
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
        self.wait_idle().await;
        info!("scheduler stopped");
    }
}

async fn run_job(inner: &Inner, job: JobDefinition, now: DateTime<Utc>) {
    let ctx = ExecContext {
        now,
        tz: inner.tz,
        send_delay: inner.settings.send_delay,
        default_tolerance_minutes: inner.settings.exit_tolerance_minutes,
    };
    let mut notified = job.notified.clone();
    if job.spec.kind.is_continuous() {
        notified.reset_if_stale(ctx.today());
    }

    info!(job_id = job.id, name = %job.spec.name, kind = %job.spec.kind, "job started");
    match inner.executors.execute(&job, &mut notified, &ctx).await {
        Ok(report) => {
            let severity = if report.failed > 0 {
                Severity::Warn
            } else {
                Severity::Info
            };
            info!(job_id = job.id, %report, "job finished");
            inner
                .log
                .push(Some(job.id), severity, format!("{}: {report}", job.spec.name));
        }
        Err(e) => {
            error!(job_id = job.id, error = %e, "job failed");
            inner
                .log
                .push(Some(job.id), Severity::Error, format!("{}: {e}", job.spec.name));
        }
    }

    let one_shot = job.spec.frequency == Frequency::OneShotTest;
    if let Err(e) = inner.jobs.record_run(job.id, now, &notified, one_shot).await {
        warn!(job_id = job.id, error = %e, "recording job run failed");
        inner.log.push(
            Some(job.id),
            Severity::Error,
            format!("{}: run not recorded: {e}", job.spec.name),
        );
    }
    if one_shot {
        info!(job_id = job.id, "one-shot job disabled after its run");
    }
}
