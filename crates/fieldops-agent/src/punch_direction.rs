// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry/exit resolution for a new punch.

use fieldops_core::types::{PunchDirection, PunchRecord};

/// Outcome of [`resolve_direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionResolution {
    pub direction: PunchDirection,
    /// Site where an open entry must be closed automatically first.
    pub auto_exit_site: Option<i64>,
}

/// Decide the direction of a punch at `site_id` from the user's punches of
/// the current local day (any order).
///
/// The direction toggles per site: no record or a last `exit` there gives
/// `entry`, a last `entry` gives `exit`. When the user's latest punch of the
/// day is an `entry` at another site, that site needs an automatic exit.
pub fn resolve_direction(today: &[PunchRecord], site_id: i64) -> DirectionResolution {
    let mut ordered: Vec<&PunchRecord> = today.iter().collect();
    ordered.sort_by_key(|r| (r.recorded_at, r.id));

    let latest = ordered.last();
    let auto_exit_site = latest
        .filter(|r| r.direction == PunchDirection::Entry && r.site_id != site_id)
        .map(|r| r.site_id);

    // An older entry here is superseded when the latest open entry is elsewhere.
    let open_here = ordered
        .iter()
        .rev()
        .find(|r| r.site_id == site_id)
        .is_some_and(|r| r.direction == PunchDirection::Entry);
    let direction = if open_here && auto_exit_site.is_none() {
        PunchDirection::Exit
    } else {
        PunchDirection::Entry
    };

    DirectionResolution {
        direction,
        auto_exit_site,
    }
}
