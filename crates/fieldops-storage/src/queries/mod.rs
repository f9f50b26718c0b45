// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table group.

pub mod contacts;
pub mod jobs;
pub mod punches;
pub mod schedules;
pub mod sites;
