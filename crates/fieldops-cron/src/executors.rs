// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job executors, one per [`JobKind`].
//!
//! Executors never decide whether a job is due; the scheduler has already
//! done that. They walk the job's recipients, tally what happened to each one
//! in a [`RunReport`] and pause `send_delay` between outbound messages.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use fieldops_core::address::find_contact;
use fieldops_core::job::{JobDefinition, JobKind, NotifiedSet};
use fieldops_core::time::local_day_bounds;
use fieldops_core::types::{Contact, PunchDirection, PunchRecord};
use fieldops_core::{ContactStore, EmailSender, FieldopsError, MessagingTransport, PunchStore};
use serde::Serialize;
use tracing::{debug, info, warn};

const EXIT_REMINDER: &str = "Olá, {nome}! Não encontramos seu registro de *saída* hoje ({data}). \
     Envie *ponto* para registrar.";
const LUNCH_REMINDER: &str = "Olá, {nome}! Não encontramos o registro do seu *intervalo de almoço* \
     hoje ({data}). Envie *ponto* para registrar.";
const REPORT_SUBJECT: &str = "Relatório de ponto {data}";

/// Everything an executor needs to know about "now".
#[derive(Debug, Clone, Copy)]
pub struct ExecContext {
    pub now: DateTime<Utc>,
    pub tz: Tz,
    pub send_delay: Duration,
    /// Reminder tolerance when the job does not set one.
    pub default_tolerance_minutes: u32,
}

impl ExecContext {
    fn local(&self) -> DateTime<Tz> {
        self.now.with_timezone(&self.tz)
    }

    pub fn today(&self) -> NaiveDate {
        self.local().date_naive()
    }
}

/// Per-run tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sent: u32,
    pub failed: u32,
    pub no_user: u32,
    pub already_notified: u32,
    pub no_schedule: u32,
    pub not_due: u32,
    pub no_entry: u32,
    pub has_exit: u32,
    pub has_punch: u32,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("sent", self.sent),
            ("failed", self.failed),
            ("no_user", self.no_user),
            ("already_notified", self.already_notified),
            ("no_schedule", self.no_schedule),
            ("not_due", self.not_due),
            ("no_entry", self.no_entry),
            ("has_exit", self.has_exit),
            ("has_punch", self.has_punch),
        ];
        let parts: Vec<String> = fields
            .iter()
            .filter(|(name, n)| *n > 0 || *name == "sent")
            .map(|(name, n)| format!("{name}={n}"))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Lunch,
    Exit,
}

/// Replace `{data}`, `{hora}` and `{nome}` in a message template.
pub fn render(template: &str, local: DateTime<Tz>, name: Option<&str>) -> String {
    template
        .replace("{data}", &local.format("%d/%m/%Y").to_string())
        .replace("{hora}", &local.format("%H:%M").to_string())
        .replace("{nome}", name.filter(|n| !n.is_empty()).unwrap_or("colaborador"))
}

/// One table row of the emailed report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub site: String,
    pub direction: Option<PunchDirection>,
    pub time: Option<NaiveTime>,
    pub automatic: bool,
}

struct ReportLine<'a> {
    name: &'a str,
    site: &'a str,
    direction: &'static str,
    time: String,
    automatic: &'static str,
}

#[derive(Template)]
#[template(path = "punch_report.html")]
struct PunchReportTemplate<'a> {
    date: String,
    rows: Vec<ReportLine<'a>>,
}

/// Minimal HTML table of the day's punches. Names and sites are escaped by
/// the template.
pub fn render_report(date: NaiveDate, rows: &[ReportRow]) -> Result<String, FieldopsError> {
    let lines = rows
        .iter()
        .map(|row| ReportLine {
            name: &row.name,
            site: &row.site,
            direction: match row.direction {
                Some(PunchDirection::Entry) => "Entrada",
                Some(PunchDirection::Exit) => "Saída",
                None => "sem registros",
            },
            time: row
                .time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default(),
            automatic: if row.automatic { "sim" } else { "" },
        })
        .collect();
    PunchReportTemplate {
        date: date.format("%d/%m/%Y").to_string(),
        rows: lines,
    }
    .render()
    .map_err(|e| FieldopsError::Internal(format!("punch report template: {e}")))
}

pub struct Executors {
    transport: Arc<dyn MessagingTransport>,
    contacts: Arc<dyn ContactStore>,
    punches: Arc<dyn PunchStore>,
    email: Option<Arc<dyn EmailSender>>,
}

impl Executors {
    pub fn new(
        transport: Arc<dyn MessagingTransport>,
        contacts: Arc<dyn ContactStore>,
        punches: Arc<dyn PunchStore>,
        email: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        Self {
            transport,
            contacts,
            punches,
            email,
        }
    }

    /// Run `job` once. Continuous checks read and extend `notified`.
    pub async fn execute(
        &self,
        job: &JobDefinition,
        notified: &mut NotifiedSet,
        ctx: &ExecContext,
    ) -> Result<RunReport, FieldopsError> {
        match job.spec.kind {
            JobKind::Broadcast => self.broadcast(job, ctx).await,
            JobKind::LunchPunchCheck => self.punch_check(job, notified, ctx, Check::Lunch).await,
            JobKind::ExitPunchCheck => self.punch_check(job, notified, ctx, Check::Exit).await,
            JobKind::EmailedReport => self.emailed_report(job, ctx).await,
        }
    }

    async fn broadcast(&self, job: &JobDefinition, ctx: &ExecContext) -> Result<RunReport, FieldopsError> {
        let contacts = self.contacts.list_contacts().await.unwrap_or_else(|e| {
            warn!(job_id = job.id, error = %e, "contact lookup failed, broadcasting without names");
            Vec::new()
        });
        let local = ctx.local();
        let mut report = RunReport::default();
        for (i, address) in job.spec.recipients.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(ctx.send_delay).await;
            }
            let name = find_contact(&contacts, address).map(|c| c.name.as_str());
            let text = render(&job.spec.message, local, name);
            match self.transport.send_text(address, &text).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(job_id = job.id, recipient = %address, error = %e, "broadcast send failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn punch_check(
        &self,
        job: &JobDefinition,
        notified: &mut NotifiedSet,
        ctx: &ExecContext,
        check: Check,
    ) -> Result<RunReport, FieldopsError> {
        let contacts = self.contacts.list_contacts().await?;
        let today = ctx.today();
        let local = ctx.local();
        let (from, to) = local_day_bounds(today, ctx.tz);
        let tolerance = job
            .spec
            .params
            .tolerance_minutes
            .unwrap_or(ctx.default_tolerance_minutes)
            .clamp(10, 30);
        let template = match (job.spec.message.trim().is_empty(), check) {
            (false, _) => job.spec.message.as_str(),
            (true, Check::Exit) => EXIT_REMINDER,
            (true, Check::Lunch) => LUNCH_REMINDER,
        };
        notified.reset_if_stale(today);

        let mut report = RunReport::default();
        let mut sent_any = false;
        for address in &job.spec.recipients {
            let Some((contact, user_id)) = find_contact(&contacts, address)
                .and_then(|c| c.user_id.map(|id| (c, id)))
            else {
                debug!(job_id = job.id, recipient = %address, "recipient has no user id");
                report.no_user += 1;
                continue;
            };
            if notified.contains(today, user_id) {
                report.already_notified += 1;
                continue;
            }
            match self.needs_reminder(user_id, check, local.time(), tolerance, today, from, to).await {
                Ok(Gap::Remind) => {}
                Ok(gap) => {
                    gap.tally(&mut report);
                    continue;
                }
                Err(e) => {
                    warn!(job_id = job.id, user_id, error = %e, "punch lookup failed");
                    report.failed += 1;
                    continue;
                }
            }

            if sent_any {
                tokio::time::sleep(ctx.send_delay).await;
            }
            let text = render(template, local, Some(contact_name(contact)));
            match self.transport.send_text(address, &text).await {
                Ok(()) => {
                    sent_any = true;
                    notified.insert(today, user_id);
                    report.sent += 1;
                    info!(job_id = job.id, user_id, check = ?check, "punch reminder sent");
                }
                Err(e) => {
                    warn!(job_id = job.id, user_id, error = %e, "punch reminder not delivered");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn needs_reminder(
        &self,
        user_id: i64,
        check: Check,
        now: NaiveTime,
        tolerance: u32,
        today: NaiveDate,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Gap, FieldopsError> {
        let Some(schedule) = self
            .punches
            .work_schedule(user_id)
            .await?
            .filter(|s| s.applies_on(today))
        else {
            return Ok(Gap::NoSchedule);
        };
        let reference = match check {
            Check::Exit => schedule.exit_time,
            Check::Lunch => match schedule.lunch_start {
                Some(t) => t,
                None => return Ok(Gap::NoSchedule),
            },
        };
        if now.signed_duration_since(reference).num_minutes() < i64::from(tolerance) {
            return Ok(Gap::NotDue);
        }

        let punches = self.punches.punches_between(user_id, from, to).await?;
        Ok(classify(&punches, check))
    }

    async fn emailed_report(&self, job: &JobDefinition, ctx: &ExecContext) -> Result<RunReport, FieldopsError> {
        let Some(email) = &self.email else {
            return Err(FieldopsError::Config(
                "emailed-report job needs the [email] section configured".into(),
            ));
        };
        let contacts = self.contacts.list_contacts().await?;
        let sites: HashMap<i64, String> = self
            .punches
            .list_sites()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let today = ctx.today();
        let (from, to) = local_day_bounds(today, ctx.tz);

        let mut report = RunReport::default();
        let mut rows = Vec::new();
        for address in &job.spec.recipients {
            let Some((contact, user_id)) = find_contact(&contacts, address)
                .and_then(|c| c.user_id.map(|id| (c, id)))
            else {
                report.no_user += 1;
                continue;
            };
            let name = contact_name(contact).to_string();
            let punches = self.punches.punches_between(user_id, from, to).await?;
            if punches.is_empty() {
                report.no_entry += 1;
                rows.push(ReportRow {
                    name,
                    site: String::new(),
                    direction: None,
                    time: None,
                    automatic: false,
                });
                continue;
            }
            for p in punches {
                rows.push(ReportRow {
                    name: name.clone(),
                    site: sites
                        .get(&p.site_id)
                        .cloned()
                        .unwrap_or_else(|| format!("#{}", p.site_id)),
                    direction: Some(p.direction),
                    time: Some(p.recorded_at.with_timezone(&ctx.tz).time()),
                    automatic: p.automatic,
                });
            }
        }

        let subject_template = if job.spec.message.trim().is_empty() {
            REPORT_SUBJECT
        } else {
            job.spec.message.as_str()
        };
        let subject = render(subject_template, ctx.local(), None);
        let html = render_report(today, &rows)?;
        email.send(&job.spec.params.report_to, &subject, &html).await?;
        report.sent = 1;
        info!(job_id = job.id, rows = rows.len(), "punch report emailed");
        Ok(report)
    }
}

fn contact_name(contact: &Contact) -> &str {
    if contact.name.trim().is_empty() {
        &contact.address
    } else {
        &contact.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    Remind,
    NoSchedule,
    NotDue,
    NoEntry,
    HasExit,
    HasPunch,
}

impl Gap {
    fn tally(self, report: &mut RunReport) {
        match self {
            Gap::Remind => {}
            Gap::NoSchedule => report.no_schedule += 1,
            Gap::NotDue => report.not_due += 1,
            Gap::NoEntry => report.no_entry += 1,
            Gap::HasExit => report.has_exit += 1,
            Gap::HasPunch => report.has_punch += 1,
        }
    }
}

/// What today's punches say about a reminder, once the schedule says it is due.
fn classify(punches: &[PunchRecord], check: Check) -> Gap {
    let Some(first_entry) = punches
        .iter()
        .position(|p| p.direction == PunchDirection::Entry)
    else {
        return Gap::NoEntry;
    };
    match check {
        Check::Exit if punches.iter().any(|p| p.direction == PunchDirection::Exit) => Gap::HasExit,
        Check::Lunch if punches.len() > first_entry + 1 => Gap::HasPunch,
        _ => Gap::Remind,
    }
}
