// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure "is this job due" decision.
//!
//! Guards run in a fixed order and the first one that fails wins:
//! enabled, minimum interval, then either the calendar guards (once per day,
//! weekday, time of day) or, for continuous kinds, the check window and the
//! poll interval.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use fieldops_core::job::{Frequency, JobDefinition};
use strum::Display;

/// Why a job was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    MinInterval,
    AlreadyRanToday,
    Weekday,
    TimeOfDay,
    OutsideWindow,
    PollInterval,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Run,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy {
    /// Runs closer together than this never happen, for any kind.
    pub min_interval: Duration,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::minutes(3),
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn too_recent(job: &JobDefinition, now: DateTime<Utc>, policy: &GuardPolicy) -> bool {
    job.last_run
        .is_some_and(|last| now.signed_duration_since(last) < policy.min_interval)
}

/// Guards for a tick at `now`, with `tz` the business timezone.
pub fn evaluate(job: &JobDefinition, now: DateTime<Utc>, tz: Tz, policy: &GuardPolicy) -> Verdict {
    if !job.spec.enabled {
        return Verdict::Skip(SkipReason::Disabled);
    }
    if too_recent(job, now, policy) {
        return Verdict::Skip(SkipReason::MinInterval);
    }

    let local = now.with_timezone(&tz);
    let today = local.date_naive();

    if job.spec.kind.is_continuous() {
        let start = job
            .spec
            .params
            .window_start
            .or_else(|| job.time_of_day())
            .unwrap_or(NaiveTime::MIN);
        let end = job.spec.params.window_end.unwrap_or_else(end_of_day);
        let time = local.time();
        if time < start || time > end {
            return Verdict::Skip(SkipReason::OutsideWindow);
        }
        if let (Some(minutes), Some(last)) = (job.spec.params.poll_interval_minutes, job.last_run) {
            if now.signed_duration_since(last) < Duration::minutes(minutes.into()) {
                return Verdict::Skip(SkipReason::PollInterval);
            }
        }
        return Verdict::Run;
    }

    if job
        .last_run
        .is_some_and(|last| last.with_timezone(&tz).date_naive() == today)
    {
        return Verdict::Skip(SkipReason::AlreadyRanToday);
    }

    let weekday_ok = match job.spec.frequency {
        Frequency::Daily => true,
        Frequency::Monthly => today.day() == 1,
        Frequency::Weekly | Frequency::Custom | Frequency::OneShotTest => {
            job.spec.weekdays.contains(today.weekday())
        }
    };
    if !weekday_ok {
        return Verdict::Skip(SkipReason::Weekday);
    }

    if u32::from(job.spec.hour) != local.hour() || u32::from(job.spec.minute) != local.minute() {
        return Verdict::Skip(SkipReason::TimeOfDay);
    }

    Verdict::Run
}

/// Guards for a manual run: only the minimum interval applies.
pub fn evaluate_manual(job: &JobDefinition, now: DateTime<Utc>, policy: &GuardPolicy) -> Verdict {
    if too_recent(job, now, policy) {
        Verdict::Skip(SkipReason::MinInterval)
    } else {
        Verdict::Run
    }
}
