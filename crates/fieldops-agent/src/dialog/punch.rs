// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Punch-registration dialog.
//!
//! The text part of the flow only picks a site. The punch itself is recorded
//! when a location arrives for the pending input, see
//! [`PunchEngine::handle_location`].

use std::sync::Arc;

use chrono::Utc;
use fieldops_core::time::local_day_bounds;
use fieldops_core::types::{Contact, Coordinate, NewPunch, PunchDirection, WorkSite};
use fieldops_core::{FieldopsError, PunchStore};
use tracing::{error, info, warn};

use super::input::parse_choice;
use super::{Next, PunchTarget, Turn, TurnContext};
use crate::copy;
use crate::keywords::Keywords;
use crate::punch_direction::resolve_direction;

const NO_SITES: &str = "Você não tem locais de trabalho autorizados. Procure o administrador.";

/// Site pick-list shown when the contact may punch at several sites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunchDialog {
    pub user_id: i64,
    pub sites: Vec<WorkSite>,
}

impl PunchDialog {
    pub fn step_name(&self) -> &'static str {
        "await_site"
    }
}

/// Result of a location delivered to a pending punch.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationOutcome {
    pub replies: Vec<String>,
    /// The pending input survives (rejected location or storage failure).
    pub keep_pending: bool,
}

fn location_prompt(site: &WorkSite) -> String {
    format!(
        "Envie sua *localização* para registrar o ponto em *{}*.",
        site.name
    )
}

fn site_menu(sites: &[WorkSite]) -> String {
    let lines: Vec<String> = sites
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} - {}", i + 1, s.name))
        .collect();
    format!("Em qual local você está?\n{}", lines.join("\n"))
}

fn direction_label(direction: PunchDirection) -> &'static str {
    match direction {
        PunchDirection::Entry => "Entrada",
        PunchDirection::Exit => "Saída",
    }
}

pub struct PunchEngine {
    store: Arc<dyn PunchStore>,
    keywords: Arc<Keywords>,
    enforce_geofence: bool,
}

impl PunchEngine {
    pub fn new(store: Arc<dyn PunchStore>, keywords: Arc<Keywords>, enforce_geofence: bool) -> Self {
        Self {
            store,
            keywords,
            enforce_geofence,
        }
    }

    fn await_location(user_id: i64, site: WorkSite) -> Turn<PunchDialog> {
        let prompt = location_prompt(&site);
        Turn::reply(prompt, Next::AwaitLocation(PunchTarget { user_id, site }))
    }

    pub async fn start(&self, profile: &Contact) -> Turn<PunchDialog> {
        let Some(user_id) = profile.user_id else {
            return Turn::reply(copy::RESTART, Next::Abort);
        };
        let mut sites = match self.store.sites(&profile.site_ids).await {
            Ok(sites) => sites,
            Err(e) => {
                warn!(user_id, error = %e, "loading work sites failed");
                return Turn::finish(copy::APOLOGY);
            }
        };
        match sites.len() {
            0 => Turn::finish(NO_SITES),
            1 => {
                let site = sites.remove(0);
                Self::await_location(user_id, site)
            }
            _ => {
                let menu = site_menu(&sites);
                Turn::stay(PunchDialog { user_id, sites }, menu)
            }
        }
    }

    pub async fn advance(
        &self,
        dialog: PunchDialog,
        input: &str,
        _ctx: &TurnContext,
    ) -> Turn<PunchDialog> {
        if self.keywords.is_cancel(input) {
            return Turn::finish(copy::CANCELLED);
        }
        match parse_choice(input, dialog.sites.len()).and_then(|i| dialog.sites.get(i)) {
            Some(site) => Self::await_location(dialog.user_id, site.clone()),
            None => {
                let menu = format!("Opção inválida.\n{}", site_menu(&dialog.sites));
                Turn::stay(dialog, menu)
            }
        }
    }

    /// Record a punch for `target` at `at`.
    ///
    /// Outside the geofence the location is rejected and the caller keeps the
    /// pending input. When the user's open entry is at another site an
    /// automatic exit is written there first, with the same coordinates.
    pub async fn handle_location(
        &self,
        target: &PunchTarget,
        at: Coordinate,
        ctx: &TurnContext,
    ) -> LocationOutcome {
        let site = &target.site;
        let distance = site.location.map(|center| center.distance_m(&at));

        if self.enforce_geofence {
            if let (Some(d), Some(radius)) = (distance, site.radius_m) {
                if d > radius {
                    info!(
                        user_id = target.user_id,
                        site = site.id,
                        distance_m = d.round(),
                        radius_m = radius,
                        "punch outside geofence"
                    );
                    return LocationOutcome {
                        replies: vec![format!(
                            "Você está a {:.0} m de *{}* (máximo permitido: {:.0} m). \
                             Aproxime-se e envie a localização novamente.",
                            d, site.name, radius
                        )],
                        keep_pending: true,
                    };
                }
            }
        }

        match self.record(target, at, distance, ctx).await {
            Ok(replies) => LocationOutcome {
                replies,
                keep_pending: false,
            },
            Err(e) => {
                error!(user_id = target.user_id, site = site.id, error = %e, "recording punch failed");
                LocationOutcome {
                    replies: vec![copy::APOLOGY.to_string()],
                    keep_pending: true,
                }
            }
        }
    }

    async fn record(
        &self,
        target: &PunchTarget,
        at: Coordinate,
        distance: Option<f64>,
        ctx: &TurnContext,
    ) -> Result<Vec<String>, FieldopsError> {
        let (from, to) = local_day_bounds(ctx.today, ctx.now.timezone());
        let today = self.store.punches_between(target.user_id, from, to).await?;
        let resolution = resolve_direction(&today, target.site.id);
        let recorded_at = ctx.now.with_timezone(&Utc);
        let mut replies = Vec::new();

        if let Some(other) = resolution.auto_exit_site {
            let other_location = self
                .store
                .sites(&[other])
                .await
                .ok()
                .and_then(|s| s.into_iter().next());
            let other_distance = other_location
                .as_ref()
                .and_then(|s| s.location)
                .map(|c| c.distance_m(&at));
            self.store
                .insert_punch(&NewPunch {
                    user_id: target.user_id,
                    site_id: other,
                    direction: PunchDirection::Exit,
                    recorded_at,
                    location: Some(at),
                    distance_m: other_distance,
                    automatic: true,
                })
                .await?;
            info!(user_id = target.user_id, site = other, "automatic exit recorded");
            let name = other_location
                .map(|s| s.name)
                .unwrap_or_else(|| "local anterior".to_string());
            replies.push(format!("Saída automática registrada em *{name}*."));
        }

        let record = self
            .store
            .insert_punch(&NewPunch {
                user_id: target.user_id,
                site_id: target.site.id,
                direction: resolution.direction,
                recorded_at,
                location: Some(at),
                distance_m: distance,
                automatic: false,
            })
            .await?;
        info!(
            user_id = target.user_id,
            site = target.site.id,
            direction = %record.direction,
            punch_id = record.id,
            "punch recorded"
        );
        replies.push(format!(
            "{} registrada às {} em *{}*.",
            direction_label(record.direction),
            ctx.now.format("%H:%M"),
            target.site.name
        ));
        Ok(replies)
    }
}
