// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket-closure dialog.
//!
//! `await_mode -> [await_client_code] -> await_selection -> await_confirmation`.
//! Open tickets are listed in pages of [`PAGE_SIZE`]; `mais` shows the next page
//! and the number typed is 1-based within the page on screen.

use std::sync::Arc;

use fieldops_core::erp::{TicketFilter, TicketSummary};
use fieldops_core::types::Contact;
use fieldops_core::ErpClient;
use tracing::{error, info, warn};

use super::input::parse_choice;
use super::{Next, Turn, TurnContext};
use crate::copy;
use crate::keywords::{fold, is_no, is_yes, Keywords};

pub const PAGE_SIZE: usize = 10;

const PROMPT_MODE: &str =
    "Como deseja localizar o chamado?\n1 - Por cliente\n2 - Pelos meus chamados (técnico)";
const PROMPT_CLIENT_CODE: &str = "Informe o *código do cliente*.";
const NO_TICKETS: &str = "Nenhum chamado aberto encontrado.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseDraft {
    pub technician_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TicketCloseStep {
    #[default]
    AwaitMode,
    AwaitClientCode,
    AwaitSelection {
        tickets: Vec<TicketSummary>,
        page: usize,
    },
    AwaitConfirmation {
        ticket: TicketSummary,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketCloseDialog {
    pub step: TicketCloseStep,
    pub draft: CloseDraft,
}

impl TicketCloseDialog {
    pub fn step_name(&self) -> &'static str {
        match self.step {
            TicketCloseStep::AwaitMode => "await_mode",
            TicketCloseStep::AwaitClientCode => "await_client_code",
            TicketCloseStep::AwaitSelection { .. } => "await_selection",
            TicketCloseStep::AwaitConfirmation { .. } => "await_confirmation",
        }
    }

    pub fn is_initial(&self) -> bool {
        self.step == TicketCloseStep::AwaitMode
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(self.step, TicketCloseStep::AwaitConfirmation { .. })
    }

    fn at(mut self, step: TicketCloseStep) -> Self {
        self.step = step;
        self
    }
}

fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE)
}

/// Tickets shown on `page` (0-based).
pub fn page_slice(tickets: &[TicketSummary], page: usize) -> &[TicketSummary] {
    let start = (page * PAGE_SIZE).min(tickets.len());
    let end = (start + PAGE_SIZE).min(tickets.len());
    &tickets[start..end]
}

fn render_page(tickets: &[TicketSummary], page: usize) -> String {
    let lines: Vec<String> = page_slice(tickets, page)
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} - #{} {} ({})", i + 1, t.id, t.summary, t.client_code))
        .collect();
    let pages = page_count(tickets.len());
    let more = if page + 1 < pages {
        "\nDigite *mais* para ver a próxima página."
    } else {
        ""
    };
    format!(
        "Chamados abertos (página {} de {pages}):\n{}\n\nDigite o número do chamado.{more}",
        page + 1,
        lines.join("\n")
    )
}

pub struct TicketCloseEngine {
    erp: Arc<dyn ErpClient>,
    keywords: Arc<Keywords>,
}

impl TicketCloseEngine {
    pub fn new(erp: Arc<dyn ErpClient>, keywords: Arc<Keywords>) -> Self {
        Self { erp, keywords }
    }

    pub fn start(&self, profile: &Contact) -> Turn<TicketCloseDialog> {
        let dialog = TicketCloseDialog {
            step: TicketCloseStep::AwaitMode,
            draft: CloseDraft {
                technician_id: profile.technician_id.clone(),
                client_id: profile.client_id.clone(),
            },
        };
        Turn::stay(dialog, PROMPT_MODE)
    }

    pub async fn advance(
        &self,
        dialog: TicketCloseDialog,
        input: &str,
        _ctx: &TurnContext,
    ) -> Turn<TicketCloseDialog> {
        if self.keywords.is_cancel(input) {
            return Turn::finish(copy::CANCELLED);
        }
        let text = input.trim();
        match dialog.step.clone() {
            TicketCloseStep::AwaitMode => match parse_choice(text, 2) {
                Some(0) => match dialog.draft.client_id.clone() {
                    Some(client) => self.list(dialog, TicketFilter::ByClient(client)).await,
                    None => Turn::stay(dialog.at(TicketCloseStep::AwaitClientCode), PROMPT_CLIENT_CODE),
                },
                Some(_) => match dialog.draft.technician_id.clone() {
                    Some(tech) => self.list(dialog, TicketFilter::ByTechnician(tech)).await,
                    None => Turn::reply(copy::RESTART, Next::Abort),
                },
                None => Turn::stay(dialog, format!("Opção inválida.\n{PROMPT_MODE}")),
            },
            TicketCloseStep::AwaitClientCode => {
                if text.is_empty() {
                    return Turn::stay(dialog, PROMPT_CLIENT_CODE);
                }
                self.list(dialog, TicketFilter::ByClient(text.to_string())).await
            }
            TicketCloseStep::AwaitSelection { tickets, page } => {
                if fold(text) == "mais" {
                    let next_page = page + 1;
                    if next_page < page_count(tickets.len()) {
                        let body = render_page(&tickets, next_page);
                        return Turn::stay(
                            dialog.at(TicketCloseStep::AwaitSelection {
                                tickets,
                                page: next_page,
                            }),
                            body,
                        );
                    }
                    let body = format!("Não há mais chamados.\n{}", render_page(&tickets, page));
                    return Turn::stay(dialog, body);
                }
                let visible = page_slice(&tickets, page);
                match parse_choice(text, visible.len()).and_then(|i| visible.get(i)) {
                    Some(ticket) => {
                        let prompt = format!(
                            "Encerrar o chamado *#{}* ({})?\n{}",
                            ticket.id,
                            ticket.summary,
                            copy::CONFIRM_HINT
                        );
                        let ticket = ticket.clone();
                        Turn::stay(dialog.at(TicketCloseStep::AwaitConfirmation { ticket }), prompt)
                    }
                    None => {
                        let body = format!("Opção inválida.\n{}", render_page(&tickets, page));
                        Turn::stay(dialog, body)
                    }
                }
            }
            TicketCloseStep::AwaitConfirmation { ticket } => {
                if is_yes(text) {
                    self.close(&ticket, dialog.draft.technician_id.as_deref()).await
                } else if is_no(text) {
                    Turn::finish(copy::CANCELLED)
                } else {
                    Turn::stay(dialog, copy::CONFIRM_HINT)
                }
            }
        }
    }

    async fn list(&self, dialog: TicketCloseDialog, filter: TicketFilter) -> Turn<TicketCloseDialog> {
        match self.erp.open_tickets(&filter).await {
            Ok(tickets) if tickets.is_empty() => Turn::finish(NO_TICKETS),
            Ok(tickets) => {
                let body = render_page(&tickets, 0);
                Turn::stay(
                    dialog.at(TicketCloseStep::AwaitSelection { tickets, page: 0 }),
                    body,
                )
            }
            Err(e) => {
                warn!(filter = ?filter, error = %e, "listing open tickets failed");
                Turn::stay(dialog, copy::APOLOGY)
            }
        }
    }

    async fn close(&self, ticket: &TicketSummary, technician: Option<&str>) -> Turn<TicketCloseDialog> {
        match self.erp.close_ticket(&ticket.id, technician).await {
            Ok(()) => {
                info!(ticket = %ticket.id, "ticket closed");
                Turn::finish(format!("Chamado *#{}* encerrado.", ticket.id))
            }
            Err(e) => {
                error!(ticket = %ticket.id, error = %e, "closing ticket failed");
                Turn::finish(copy::APOLOGY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickets(n: usize) -> Vec<TicketSummary> {
        (1..=n)
            .map(|i| TicketSummary {
                id: format!("T{i}"),
                client_code: "C001".into(),
                summary: format!("problema {i}"),
                opened_at: None,
            })
            .collect()
    }

    #[test]
    fn pages_hold_ten_tickets() {
        let all = tickets(23);
        assert_eq!(page_count(all.len()), 3);
        assert_eq!(page_slice(&all, 0).len(), 10);
        assert_eq!(page_slice(&all, 2).len(), 3);
        assert_eq!(page_slice(&all, 1)[0].id, "T11");
        assert!(page_slice(&all, 5).is_empty());
    }

    #[test]
    fn last_page_has_no_more_hint() {
        let all = tickets(12);
        assert!(render_page(&all, 0).contains("*mais*"));
        assert!(!render_page(&all, 1).contains("*mais*"));
    }
}
