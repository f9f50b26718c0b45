// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation state keyed by sender address.
//!
//! A sender has at most one [`Session`] and at most one [`PendingInput`].
//! Both expire after the configured inactivity TTL; [`SessionStore::sweep_expired`]
//! evicts them and reports the affected senders.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::dialog::{Dialog, DialogKind, PunchTarget};

/// An active dialog plus its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub dialog: Dialog,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Single-purpose marker waiting for a non-text input.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingInput {
    AwaitingLocation(PunchTarget),
}

impl PendingInput {
    pub fn kind(&self) -> DialogKind {
        match self {
            PendingInput::AwaitingLocation(_) => DialogKind::Punch,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingEntry {
    input: PendingInput,
    created_at: DateTime<Utc>,
}

/// Snapshot of one sender's state for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub sender: String,
    pub kind: Option<DialogKind>,
    pub step: Option<&'static str>,
    pub pending: Option<DialogKind>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: DashMap<String, Session>,
    pending: DashMap<String, PendingEntry>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            pending: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn get(&self, sender: &str) -> Option<Session> {
        self.sessions.get(sender).map(|s| s.clone())
    }

    /// Store `dialog` for `sender`, keeping the creation time of an existing
    /// session of the same kind.
    pub fn put(&self, sender: &str, dialog: Dialog, now: DateTime<Utc>) {
        self.sessions
            .entry(sender.to_string())
            .and_modify(|s| {
                if s.dialog.kind() != dialog.kind() {
                    s.created_at = now;
                }
                s.dialog = dialog.clone();
                s.last_activity = now;
            })
            .or_insert_with(|| Session {
                dialog,
                created_at: now,
                last_activity: now,
            });
    }

    pub fn remove(&self, sender: &str) -> Option<Session> {
        self.sessions.remove(sender).map(|(_, s)| s)
    }

    pub fn pending(&self, sender: &str) -> Option<PendingInput> {
        self.pending.get(sender).map(|p| p.input.clone())
    }

    pub fn set_pending(&self, sender: &str, input: PendingInput, now: DateTime<Utc>) {
        self.pending.insert(
            sender.to_string(),
            PendingEntry {
                input,
                created_at: now,
            },
        );
    }

    pub fn remove_pending(&self, sender: &str) -> Option<PendingInput> {
        self.pending.remove(sender).map(|(_, p)| p.input)
    }

    /// Drop session and pending input; true when either existed.
    pub fn clear(&self, sender: &str) -> bool {
        let had_session = self.remove(sender).is_some();
        let had_pending = self.remove_pending(sender).is_some();
        had_session || had_pending
    }

    fn is_expired(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last) > self.ttl
    }

    /// Evict everything idle for longer than the TTL. Returns each affected
    /// sender once, sorted.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut evicted = BTreeSet::new();
        self.sessions.retain(|sender, s| {
            let keep = !self.is_expired(s.last_activity, now);
            if !keep {
                debug!(sender = %sender, kind = %s.dialog.kind(), "session expired");
                evicted.insert(sender.clone());
            }
            keep
        });
        self.pending.retain(|sender, p| {
            let keep = !self.is_expired(p.created_at, now);
            if !keep {
                debug!(sender = %sender, "pending input expired");
                evicted.insert(sender.clone());
            }
            keep
        });
        evicted.into_iter().collect()
    }

    /// Number of live sessions (pending inputs excluded).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Every sender with a session or pending input.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut out: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|s| SessionInfo {
                sender: s.key().clone(),
                kind: Some(s.dialog.kind()),
                step: Some(s.dialog.step_name()),
                pending: self.pending(s.key()).map(|p| p.kind()),
                created_at: s.created_at,
                last_activity: s.last_activity,
            })
            .collect();
        for p in self.pending.iter() {
            if !self.sessions.contains_key(p.key()) {
                out.push(SessionInfo {
                    sender: p.key().clone(),
                    kind: None,
                    step: None,
                    pending: Some(p.input.kind()),
                    created_at: p.created_at,
                    last_activity: p.created_at,
                });
            }
        }
        out.sort_by(|a, b| a.sender.cmp(&b.sender));
        out
    }
}
