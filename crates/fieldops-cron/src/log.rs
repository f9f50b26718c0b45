// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-memory execution log served by the admin API.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub job_id: Option<i64>,
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Append-only ring buffer; the oldest entry is dropped once full.
pub struct ExecutionLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl ExecutionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, job_id: Option<i64>, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry {
            job_id,
            severity,
            message: message.into(),
            at: Utc::now(),
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let log = ExecutionLog::new(3);
        for i in 0..5 {
            log.push(Some(i), Severity::Info, format!("run {i}"));
        }
        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].message, "run 4");
        assert_eq!(recent[2].message, "run 2");
    }

    #[test]
    fn recent_honours_the_limit() {
        let log = ExecutionLog::new(10);
        log.push(None, Severity::Warn, "a");
        log.push(None, Severity::Error, "b");
        let one = log.recent(1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].severity, Severity::Error);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(Severity::Warn.to_string(), "warn");
        let json = serde_json::to_value(Severity::Error).unwrap();
        assert_eq!(json, "error");
    }
}
