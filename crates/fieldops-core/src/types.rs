// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the conversation core, the scheduler and the adapters.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Erp,
    Storage,
    Email,
}

// --- Messaging types ---

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects non-finite, out-of-range and null-island values.
    pub fn is_plausible(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
            && !(self.lat == 0.0 && self.lng == 0.0)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// An opaque media attachment as delivered by the transport (base64 payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: String,
}

/// An inbound unit delivered by the messaging transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    /// Raw sender address as the transport reports it (may carry a suffix).
    pub sender: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub media: Option<MediaBlob>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Build a plain text message.
    pub fn text(id: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            text: Some(text.into()),
            location: None,
            media: None,
            received_at: Utc::now(),
        }
    }

    /// Build a native location share.
    pub fn location(id: impl Into<String>, sender: impl Into<String>, at: Coordinate) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            text: None,
            location: Some(at),
            media: None,
            received_at: Utc::now(),
        }
    }

    /// Message text, or an empty string for non-text payloads.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A text message to deliver through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: String,
    pub text: String,
}

// --- Contact types ---

/// A capability a sender may be granted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateTickets,
    CloseTickets,
    LogInterventions,
    RegisterPunch,
}

/// Bitmask of weekdays; bit 0 is Sunday, bit 6 is Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdayMask(pub u8);

impl WeekdayMask {
    pub const ALL: WeekdayMask = WeekdayMask(0b0111_1111);
    pub const WORKDAYS: WeekdayMask = WeekdayMask(0b0011_1110);

    pub fn from_days(days: &[Weekday]) -> Self {
        WeekdayMask(
            days.iter()
                .fold(0u8, |acc, d| acc | (1 << d.num_days_from_sunday())),
        )
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }
}

impl Default for WeekdayMask {
    fn default() -> Self {
        WeekdayMask::WORKDAYS
    }
}

/// A named group of contacts carrying default capability flags and validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub can_create_tickets: bool,
    #[serde(default)]
    pub can_register_punch: bool,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// A contact row as administered: unset fields fall back to the owning list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactEntry {
    #[serde(default)]
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub list_id: Option<i64>,
    #[serde(default)]
    pub can_create_tickets: Option<bool>,
    #[serde(default)]
    pub can_register_punch: Option<bool>,
    #[serde(default)]
    pub technician_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub site_ids: Vec<i64>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// One resolved contact per address, the only shape the authorization gate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub address: String,
    pub name: String,
    pub can_create_tickets: bool,
    pub can_register_punch: bool,
    pub technician_id: Option<String>,
    pub client_id: Option<String>,
    pub user_id: Option<i64>,
    pub site_ids: Vec<i64>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

impl Contact {
    /// Resolve an entry against its list, field by field.
    pub fn resolve(entry: &ContactEntry, list: Option<&ContactList>) -> Contact {
        let blank_id = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Contact {
            id: entry.id,
            address: entry.address.clone(),
            name: entry.name.clone(),
            can_create_tickets: entry
                .can_create_tickets
                .or(list.map(|l| l.can_create_tickets))
                .unwrap_or(false),
            can_register_punch: entry
                .can_register_punch
                .or(list.map(|l| l.can_register_punch))
                .unwrap_or(false),
            technician_id: blank_id(&entry.technician_id),
            client_id: blank_id(&entry.client_id),
            user_id: entry.user_id,
            site_ids: entry.site_ids.clone(),
            valid_from: entry.valid_from.or(list.and_then(|l| l.valid_from)),
            valid_until: entry.valid_until.or(list.and_then(|l| l.valid_until)),
        }
    }
}

// --- Work sites, schedules and punches ---

/// A place where punches may be registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSite {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub radius_m: Option<f64>,
}

/// Direction of a time-clock punch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PunchDirection {
    Entry,
    Exit,
}

/// A stored time-clock punch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchRecord {
    pub id: i64,
    pub user_id: i64,
    pub site_id: i64,
    pub direction: PunchDirection,
    pub recorded_at: DateTime<Utc>,
    pub location: Option<Coordinate>,
    pub distance_m: Option<f64>,
    pub automatic: bool,
}

/// A punch about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPunch {
    pub user_id: i64,
    pub site_id: i64,
    pub direction: PunchDirection,
    pub recorded_at: DateTime<Utc>,
    pub location: Option<Coordinate>,
    pub distance_m: Option<f64>,
    pub automatic: bool,
}

/// A user's configured working hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSchedule {
    pub user_id: i64,
    pub entry_time: NaiveTime,
    pub exit_time: NaiveTime,
    #[serde(default)]
    pub lunch_start: Option<NaiveTime>,
    #[serde(default)]
    pub weekdays: WeekdayMask,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

impl WorkSchedule {
    /// True when `date` is inside the validity window and a work weekday.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if self.valid_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.valid_until.is_some_and(|until| date > until) {
            return false;
        }
        self.weekdays.contains_date(date)
    }
}
