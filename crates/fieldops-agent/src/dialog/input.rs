// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsers for free-text answers.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::keywords::fold;

/// 1-based menu choice in `1..=max`, returned 0-based.
pub fn parse_choice(text: &str, max: usize) -> Option<usize> {
    let n: usize = text.trim().trim_end_matches(['.', ')']).parse().ok()?;
    (1..=max).contains(&n).then(|| n - 1)
}

/// `hoje`, `ontem`, `dd/mm` (current year) or `dd/mm/yyyy`.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let t = fold(text.trim());
    match t.as_str() {
        "hoje" => return Some(today),
        "ontem" => return today.checked_sub_signed(Duration::days(1)),
        _ => {}
    }
    let parts: Vec<&str> = t.split(['/', '-', '.']).collect();
    let (day, month, year) = match parts.as_slice() {
        [d, m] => (d.parse().ok()?, m.parse().ok()?, today.year()),
        [d, m, y] if y.len() == 4 => (d.parse().ok()?, m.parse().ok()?, y.parse().ok()?),
        [d, m, y] if y.len() == 2 => {
            let yy: i32 = y.parse().ok()?;
            (d.parse().ok()?, m.parse().ok()?, 2000 + yy)
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `HH:MM`, `HHhMM` or `HHh`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let t = fold(text.trim());
    let (h, m) = t.split_once([':', 'h'])?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = if m.trim().is_empty() {
        0
    } else {
        m.trim().parse().ok()?
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Positive quantity; accepts a decimal comma.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let q: f64 = text.trim().replace(',', ".").parse().ok()?;
    (q.is_finite() && q > 0.0).then_some(q)
}

/// `dd/mm/yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
