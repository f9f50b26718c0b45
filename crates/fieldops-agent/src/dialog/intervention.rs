// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intervention-logging dialog.
//!
//! The longest flow: ticket, outcome, service mode, description, an optional
//! parts loop, then start and end of the work. End must be strictly after
//! start; a violation re-asks only the end time.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fieldops_core::erp::{
    Client, InterventionOutcome, NewIntervention, Part, PartUsage, ServiceMode, TicketFilter,
    TicketSummary,
};
use fieldops_core::types::Contact;
use fieldops_core::ErpClient;
use tracing::{error, info, warn};

use super::input::{format_date, parse_choice, parse_date, parse_quantity, parse_time};
use super::{Next, Turn, TurnContext};
use crate::copy;
use crate::keywords::{is_no, is_yes, Keywords};

const PROMPT_CLIENT: &str = "Informe o *código do cliente* atendido.";
const PROMPT_OUTCOME: &str =
    "Qual a situação do chamado após o atendimento?\n1 - Em andamento\n2 - Resolvido\n3 - Aguardando peças";
const PROMPT_MODE: &str = "O atendimento foi:\n1 - Remoto\n2 - Presencial";
const PROMPT_DESCRIPTION: &str = "Descreva o que foi feito.";
const PROMPT_PARTS: &str = "Foram utilizadas peças? (*sim* / *não*)";
const PROMPT_SCAN: &str = "Envie o *código* da peça.";
const PROMPT_QUANTITY: &str = "Qual a quantidade utilizada?";
const PROMPT_MORE_PARTS: &str = "Deseja adicionar outra peça? (*sim* / *não*)";
const PROMPT_START_DATE: &str = "Data de início (*hoje*, *ontem* ou dd/mm/aaaa):";
const PROMPT_START_TIME: &str = "Hora de início (HH:MM):";
const PROMPT_END_DATE: &str = "Data de término (*hoje*, *ontem* ou dd/mm/aaaa):";
const PROMPT_END_TIME: &str = "Hora de término (HH:MM):";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionDraft {
    pub technician_id: Option<String>,
    pub client: Option<Client>,
    pub ticket: Option<TicketSummary>,
    pub outcome: Option<InterventionOutcome>,
    pub mode: Option<ServiceMode>,
    pub description: Option<String>,
    pub parts: Vec<PartUsage>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
}

impl InterventionDraft {
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        Some(self.start_date?.and_time(self.start_time?))
    }

    pub fn ended_at(&self) -> Option<NaiveDateTime> {
        Some(self.end_date?.and_time(self.end_time?))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum InterventionStep {
    #[default]
    AwaitClient,
    AwaitTicket {
        tickets: Vec<TicketSummary>,
    },
    AwaitOutcome,
    AwaitMode,
    AwaitDescription,
    AwaitPartsDecision,
    AwaitScan,
    AwaitQuantity {
        part: Part,
    },
    AwaitMoreParts,
    AwaitStartDate,
    AwaitStartTime,
    AwaitEndDate,
    AwaitEndTime,
    AwaitConfirmation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionDialog {
    pub step: InterventionStep,
    pub draft: InterventionDraft,
}

impl InterventionDialog {
    pub fn step_name(&self) -> &'static str {
        match self.step {
            InterventionStep::AwaitClient => "await_client",
            InterventionStep::AwaitTicket { .. } => "await_ticket",
            InterventionStep::AwaitOutcome => "await_outcome_state",
            InterventionStep::AwaitMode => "await_mode",
            InterventionStep::AwaitDescription => "await_description",
            InterventionStep::AwaitPartsDecision => "await_parts_decision",
            InterventionStep::AwaitScan => "await_scan",
            InterventionStep::AwaitQuantity { .. } => "await_quantity",
            InterventionStep::AwaitMoreParts => "await_more_parts",
            InterventionStep::AwaitStartDate => "await_start_date",
            InterventionStep::AwaitStartTime => "await_start_time",
            InterventionStep::AwaitEndDate => "await_end_date",
            InterventionStep::AwaitEndTime => "await_end_time",
            InterventionStep::AwaitConfirmation => "await_confirmation",
        }
    }

    pub fn is_initial(&self) -> bool {
        self.step == InterventionStep::AwaitClient
    }

    pub fn is_confirmation(&self) -> bool {
        self.step == InterventionStep::AwaitConfirmation
    }

    fn at(mut self, step: InterventionStep) -> Self {
        self.step = step;
        self
    }
}

/// Whole minutes between start and end; `None` when end is not after start.
pub fn duration_minutes(start: NaiveDateTime, end: NaiveDateTime) -> Option<i64> {
    let minutes = end.signed_duration_since(start).num_minutes();
    (end > start).then_some(minutes)
}

fn outcome_label(outcome: InterventionOutcome) -> &'static str {
    match outcome {
        InterventionOutcome::InProgress => "Em andamento",
        InterventionOutcome::Resolved => "Resolvido",
        InterventionOutcome::AwaitingParts => "Aguardando peças",
    }
}

fn mode_label(mode: ServiceMode) -> &'static str {
    match mode {
        ServiceMode::Remote => "Remoto",
        ServiceMode::Onsite => "Presencial",
    }
}

fn ticket_menu(tickets: &[TicketSummary]) -> String {
    let lines: Vec<String> = tickets
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} - #{} {}", i + 1, t.id, t.summary))
        .collect();
    format!("Qual chamado foi atendido?\n{}", lines.join("\n"))
}

fn summary(draft: &InterventionDraft) -> Option<String> {
    let ticket = draft.ticket.as_ref()?;
    let start = draft.started_at()?;
    let end = draft.ended_at()?;
    let minutes = duration_minutes(start, end)?;
    let parts = if draft.parts.is_empty() {
        "nenhuma".to_string()
    } else {
        draft
            .parts
            .iter()
            .map(|p| format!("{} x {} ({})", p.quantity, p.description, p.code))
            .collect::<Vec<_>>()
            .join(", ")
    };
    Some(format!(
        "Confira o atendimento:\nChamado: #{}\nSituação: {}\nModalidade: {}\nDescrição: {}\nPeças: {parts}\nInício: {} {}\nTérmino: {} {}\nDuração: {minutes} min\n\n{}",
        ticket.id,
        outcome_label(draft.outcome?),
        mode_label(draft.mode?),
        draft.description.as_deref()?,
        format_date(start.date()),
        start.format("%H:%M"),
        format_date(end.date()),
        end.format("%H:%M"),
        copy::CONFIRM_HINT
    ))
}

pub struct InterventionEngine {
    erp: Arc<dyn ErpClient>,
    keywords: Arc<Keywords>,
}

impl InterventionEngine {
    pub fn new(erp: Arc<dyn ErpClient>, keywords: Arc<Keywords>) -> Self {
        Self { erp, keywords }
    }

    pub fn start(&self, profile: &Contact) -> Turn<InterventionDialog> {
        let dialog = InterventionDialog {
            step: InterventionStep::AwaitClient,
            draft: InterventionDraft {
                technician_id: profile.technician_id.clone(),
                ..Default::default()
            },
        };
        Turn::stay(dialog, PROMPT_CLIENT)
    }

    pub async fn advance(
        &self,
        dialog: InterventionDialog,
        input: &str,
        ctx: &TurnContext,
    ) -> Turn<InterventionDialog> {
        if self.keywords.is_cancel(input) {
            return Turn::finish(copy::CANCELLED);
        }
        let text = input.trim();
        let invalid = |d: InterventionDialog, prompt: &str| {
            Turn::stay(d, format!("Resposta inválida.\n{prompt}"))
        };

        match dialog.step.clone() {
            InterventionStep::AwaitClient => self.on_client(dialog, text).await,
            InterventionStep::AwaitTicket { tickets } => {
                match parse_choice(text, tickets.len()).and_then(|i| tickets.get(i)) {
                    Some(ticket) => {
                        let mut next = dialog.at(InterventionStep::AwaitOutcome);
                        next.draft.ticket = Some(ticket.clone());
                        Turn::stay(next, PROMPT_OUTCOME)
                    }
                    None => invalid(dialog, &ticket_menu(&tickets)),
                }
            }
            InterventionStep::AwaitOutcome => {
                let outcome = match parse_choice(text, 3) {
                    Some(0) => InterventionOutcome::InProgress,
                    Some(1) => InterventionOutcome::Resolved,
                    Some(_) => InterventionOutcome::AwaitingParts,
                    None => return invalid(dialog, PROMPT_OUTCOME),
                };
                let mut next = dialog.at(InterventionStep::AwaitMode);
                next.draft.outcome = Some(outcome);
                Turn::stay(next, PROMPT_MODE)
            }
            InterventionStep::AwaitMode => {
                let mode = match parse_choice(text, 2) {
                    Some(0) => ServiceMode::Remote,
                    Some(_) => ServiceMode::Onsite,
                    None => return invalid(dialog, PROMPT_MODE),
                };
                let mut next = dialog.at(InterventionStep::AwaitDescription);
                next.draft.mode = Some(mode);
                Turn::stay(next, PROMPT_DESCRIPTION)
            }
            InterventionStep::AwaitDescription => {
                if text.chars().count() < 3 {
                    return Turn::stay(dialog, PROMPT_DESCRIPTION);
                }
                let mut next = dialog.at(InterventionStep::AwaitPartsDecision);
                next.draft.description = Some(text.to_string());
                Turn::stay(next, PROMPT_PARTS)
            }
            InterventionStep::AwaitPartsDecision | InterventionStep::AwaitMoreParts => {
                let prompt = if dialog.step == InterventionStep::AwaitMoreParts {
                    PROMPT_MORE_PARTS
                } else {
                    PROMPT_PARTS
                };
                if is_yes(text) {
                    Turn::stay(dialog.at(InterventionStep::AwaitScan), PROMPT_SCAN)
                } else if is_no(text) {
                    Turn::stay(dialog.at(InterventionStep::AwaitStartDate), PROMPT_START_DATE)
                } else {
                    invalid(dialog, prompt)
                }
            }
            InterventionStep::AwaitScan => self.on_scan(dialog, text).await,
            InterventionStep::AwaitQuantity { part } => match parse_quantity(text) {
                Some(quantity) => {
                    let mut next = dialog.at(InterventionStep::AwaitMoreParts);
                    next.draft.parts.push(PartUsage {
                        code: part.code,
                        description: part.description,
                        quantity,
                    });
                    Turn::stay(next, PROMPT_MORE_PARTS)
                }
                None => invalid(dialog, PROMPT_QUANTITY),
            },
            InterventionStep::AwaitStartDate => match parse_date(text, ctx.today) {
                Some(date) if date <= ctx.today => {
                    let mut next = dialog.at(InterventionStep::AwaitStartTime);
                    next.draft.start_date = Some(date);
                    Turn::stay(next, PROMPT_START_TIME)
                }
                Some(_) => Turn::stay(
                    dialog,
                    format!("A data de início não pode ser futura.\n{PROMPT_START_DATE}"),
                ),
                None => invalid(dialog, PROMPT_START_DATE),
            },
            InterventionStep::AwaitStartTime => match parse_time(text) {
                Some(time) => {
                    let mut next = dialog.at(InterventionStep::AwaitEndDate);
                    next.draft.start_time = Some(time);
                    Turn::stay(next, PROMPT_END_DATE)
                }
                None => invalid(dialog, PROMPT_START_TIME),
            },
            InterventionStep::AwaitEndDate => match parse_date(text, ctx.today) {
                Some(date) if dialog.draft.start_date.is_some_and(|s| date < s) => Turn::stay(
                    dialog,
                    format!("A data de término não pode ser anterior ao início.\n{PROMPT_END_DATE}"),
                ),
                Some(date) => {
                    let mut next = dialog.at(InterventionStep::AwaitEndTime);
                    next.draft.end_date = Some(date);
                    Turn::stay(next, PROMPT_END_TIME)
                }
                None => invalid(dialog, PROMPT_END_DATE),
            },
            InterventionStep::AwaitEndTime => {
                let Some(time) = parse_time(text) else {
                    return invalid(dialog, PROMPT_END_TIME);
                };
                let Some(start) = dialog.draft.started_at() else {
                    return Turn::reply(copy::RESTART, Next::Abort);
                };
                let mut next = dialog.clone();
                next.draft.end_time = Some(time);
                let ends_after = next.draft.ended_at().is_some_and(|end| end > start);
                if !ends_after {
                    return Turn::stay(
                        dialog,
                        format!(
                            "O término deve ser depois do início ({}).\n{PROMPT_END_TIME}",
                            start.format("%d/%m/%Y %H:%M")
                        ),
                    );
                }
                let next = next.at(InterventionStep::AwaitConfirmation);
                match summary(&next.draft) {
                    Some(body) => Turn::stay(next, body),
                    None => Turn::reply(copy::RESTART, Next::Abort),
                }
            }
            InterventionStep::AwaitConfirmation => {
                if is_yes(text) {
                    self.submit(dialog.draft).await
                } else if is_no(text) {
                    Turn::finish(copy::CANCELLED)
                } else {
                    Turn::stay(dialog, copy::CONFIRM_HINT)
                }
            }
        }
    }

    async fn on_client(&self, dialog: InterventionDialog, code: &str) -> Turn<InterventionDialog> {
        if code.is_empty() {
            return Turn::stay(dialog, PROMPT_CLIENT);
        }
        let client = match self.erp.find_client(code).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                return Turn::stay(dialog, format!("Cliente *{code}* não encontrado.\n{PROMPT_CLIENT}"));
            }
            Err(e) => {
                warn!(client = %code, error = %e, "client lookup failed");
                return Turn::stay(dialog, copy::APOLOGY);
            }
        };
        let tickets = match self
            .erp
            .open_tickets(&TicketFilter::ByClient(client.code.clone()))
            .await
        {
            Ok(tickets) => tickets,
            Err(e) => {
                warn!(client = %client.code, error = %e, "listing open tickets failed");
                return Turn::stay(dialog, copy::APOLOGY);
            }
        };
        if tickets.is_empty() {
            return Turn::stay(
                dialog,
                format!("O cliente *{}* não tem chamados abertos.\n{PROMPT_CLIENT}", client.name),
            );
        }
        let menu = ticket_menu(&tickets);
        let mut next = dialog.at(InterventionStep::AwaitTicket { tickets });
        next.draft.client = Some(client);
        Turn::stay(next, menu)
    }

    async fn on_scan(&self, dialog: InterventionDialog, code: &str) -> Turn<InterventionDialog> {
        if code.is_empty() {
            return Turn::stay(dialog, PROMPT_SCAN);
        }
        match self.erp.find_part(code).await {
            Ok(Some(part)) => {
                let prompt = format!("Peça: *{}*.\n{PROMPT_QUANTITY}", part.description);
                Turn::stay(dialog.at(InterventionStep::AwaitQuantity { part }), prompt)
            }
            Ok(None) => Turn::stay(
                dialog,
                format!("Peça *{code}* não encontrada no catálogo.\n{PROMPT_SCAN}"),
            ),
            Err(e) => {
                warn!(part = %code, error = %e, "part lookup failed");
                Turn::stay(dialog, copy::APOLOGY)
            }
        }
    }

    async fn submit(&self, draft: InterventionDraft) -> Turn<InterventionDialog> {
        let (Some(ticket), Some(outcome), Some(mode), Some(description), Some(start), Some(end)) = (
            draft.ticket.as_ref(),
            draft.outcome,
            draft.mode,
            draft.description.clone(),
            draft.started_at(),
            draft.ended_at(),
        ) else {
            return Turn::reply(copy::RESTART, Next::Abort);
        };
        let intervention = NewIntervention {
            ticket_id: ticket.id.clone(),
            technician_id: draft.technician_id.clone(),
            outcome,
            mode,
            description,
            parts: draft.parts.clone(),
            started_at: start,
            ended_at: end,
        };
        match self.erp.create_intervention(&intervention).await {
            Ok(reference) => {
                info!(
                    ticket = %ticket.id,
                    intervention = %reference.id,
                    parts = intervention.parts.len(),
                    "intervention recorded"
                );
                Turn::finish(format!(
                    "Atendimento registrado no chamado *#{}* (registro {}).",
                    ticket.id, reference.id
                ))
            }
            Err(e) => {
                error!(ticket = %ticket.id, error = %e, "recording intervention failed");
                Turn::finish(copy::APOLOGY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn duration_requires_end_after_start() {
        assert_eq!(duration_minutes(at(10, 0), at(10, 30)), Some(30));
        assert_eq!(duration_minutes(at(10, 0), at(9, 30)), None);
        assert_eq!(duration_minutes(at(10, 0), at(10, 0)), None);
    }

    #[test]
    fn step_names_follow_the_flow() {
        let mut d = InterventionDialog::default();
        assert!(d.is_initial());
        assert_eq!(d.step_name(), "await_client");
        d.step = InterventionStep::AwaitConfirmation;
        assert!(d.is_confirmation());
    }
}
