// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring job definitions shared by the job store, the scheduler and the admin API.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FieldopsError;
use crate::types::WeekdayMask;

/// How often a job is meant to fire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
    OneShotTest,
}

/// What a job does when it fires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Broadcast,
    LunchPunchCheck,
    ExitPunchCheck,
    EmailedReport,
}

impl JobKind {
    /// Continuous verification kinds may fire several times a day inside a window.
    pub fn is_continuous(&self) -> bool {
        matches!(self, JobKind::LunchPunchCheck | JobKind::ExitPunchCheck)
    }
}

/// Per-kind extra parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParams {
    /// Start of the check window (continuous kinds). Defaults to the job time.
    pub window_start: Option<NaiveTime>,
    /// End of the check window (continuous kinds). Defaults to 23:59.
    pub window_end: Option<NaiveTime>,
    /// Minimum minutes between two runs of a continuous kind.
    pub poll_interval_minutes: Option<u32>,
    /// Minutes after the scheduled time before a user is reminded.
    pub tolerance_minutes: Option<u32>,
    /// Email addresses receiving the emailed report.
    pub report_to: Vec<String>,
}

/// Users already notified on a given local day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifiedSet {
    pub date: Option<NaiveDate>,
    pub user_ids: BTreeSet<i64>,
}

impl NotifiedSet {
    /// Drop the set when its date stamp is not `today`.
    pub fn reset_if_stale(&mut self, today: NaiveDate) {
        if self.date != Some(today) {
            self.date = Some(today);
            self.user_ids.clear();
        }
    }

    pub fn contains(&self, today: NaiveDate, user_id: i64) -> bool {
        self.date == Some(today) && self.user_ids.contains(&user_id)
    }

    pub fn insert(&mut self, today: NaiveDate, user_id: i64) {
        self.reset_if_stale(today);
        self.user_ids.insert(user_id);
    }
}

/// The administrable part of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub frequency: Frequency,
    pub hour: u8,
    pub minute: u8,
    #[serde(default)]
    pub weekdays: WeekdayMask,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub kind: JobKind,
    #[serde(default)]
    pub params: JobParams,
}

fn default_enabled() -> bool {
    true
}

impl JobSpec {
    /// Semantic checks the admin surface applies before persisting.
    pub fn validate(&self) -> Result<(), FieldopsError> {
        if self.name.trim().is_empty() {
            return Err(FieldopsError::Validation("job name must not be empty".into()));
        }
        if self.hour > 23 || self.minute > 59 {
            return Err(FieldopsError::Validation(format!(
                "invalid time of day {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        if self.kind == JobKind::EmailedReport {
            if self.params.report_to.is_empty() {
                return Err(FieldopsError::Validation(
                    "emailed-report jobs need at least one report_to address".into(),
                ));
            }
        } else if self.recipients.is_empty() {
            return Err(FieldopsError::Validation(
                "job must have at least one recipient".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.params.window_start, self.params.window_end) {
            if end <= start {
                return Err(FieldopsError::Validation(
                    "window_end must be after window_start".into(),
                ));
            }
        }
        if self.params.poll_interval_minutes == Some(0) {
            return Err(FieldopsError::Validation(
                "poll_interval_minutes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A persisted recurring job with its run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: i64,
    #[serde(flatten)]
    pub spec: JobSpec,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u32,
    #[serde(default)]
    pub notified: NotifiedSet,
}

impl JobDefinition {
    /// Scheduled time of day.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.spec.hour.into(), self.spec.minute.into(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn spec(kind: JobKind) -> JobSpec {
        JobSpec {
            name: "lembrete".into(),
            message: "Bom dia".into(),
            recipients: vec!["5511999990000".into()],
            frequency: Frequency::Daily,
            hour: 8,
            minute: 0,
            weekdays: WeekdayMask::WORKDAYS,
            enabled: true,
            kind,
            params: JobParams::default(),
        }
    }

    #[test]
    fn kinds_and_frequencies_use_kebab_case() {
        assert_eq!(Frequency::OneShotTest.to_string(), "one-shot-test");
        assert_eq!(JobKind::from_str("exit-punch-check").unwrap(), JobKind::ExitPunchCheck);
        let json = serde_json::to_string(&JobKind::LunchPunchCheck).unwrap();
        assert_eq!(json, "\"lunch-punch-check\"");
    }

    #[test]
    fn continuous_kinds() {
        assert!(JobKind::ExitPunchCheck.is_continuous());
        assert!(JobKind::LunchPunchCheck.is_continuous());
        assert!(!JobKind::Broadcast.is_continuous());
        assert!(!JobKind::EmailedReport.is_continuous());
    }

    #[test]
    fn notified_set_resets_on_new_day() {
        let d1 = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 5, 5).unwrap();
        let mut set = NotifiedSet::default();
        set.insert(d1, 10);
        assert!(set.contains(d1, 10));
        assert!(!set.contains(d2, 10));
        set.reset_if_stale(d2);
        assert!(set.user_ids.is_empty());
        assert_eq!(set.date, Some(d2));
    }

    #[test]
    fn spec_validation() {
        assert!(spec(JobKind::Broadcast).validate().is_ok());

        let mut bad = spec(JobKind::Broadcast);
        bad.hour = 24;
        assert!(bad.validate().is_err());

        let mut no_recipients = spec(JobKind::Broadcast);
        no_recipients.recipients.clear();
        assert!(no_recipients.validate().is_err());

        let mut report = spec(JobKind::EmailedReport);
        report.recipients.clear();
        assert!(report.validate().is_err());
        report.params.report_to = vec!["rh@example.com".into()];
        assert!(report.validate().is_ok());
    }

    #[test]
    fn definition_serializes_flat() {
        let job = JobDefinition {
            id: 3,
            spec: spec(JobKind::ExitPunchCheck),
            last_run: None,
            run_count: 0,
            notified: NotifiedSet::default(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["kind"], "exit-punch-check");
        assert_eq!(value["hour"], 8);
        assert_eq!(job.time_of_day(), NaiveTime::from_hms_opt(8, 0, 0));
    }
}
