// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket-creation dialog.
//!
//! `await_client -> [await_contract] -> await_problem -> await_priority ->
//! await_confirmation`. The contract pick-list is skipped when the client has
//! at most one active contract.

use std::sync::{Arc, LazyLock};

use fieldops_core::erp::{Client, Contract, NewTicket};
use fieldops_core::types::Contact;
use fieldops_core::{ErpClient, FieldopsError};
use regex::Regex;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{error, info, warn};

use super::input::parse_choice;
use super::{Next, Turn, TurnContext};
use crate::copy;
use crate::keywords::{is_no, is_yes, Keywords};

/// Ticket number inside an ERP error body, e.g. `{"id": 4711}` or `chamado 4711`.
static TICKET_IN_BODY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:"id"|\bid|chamado|ticket|n[uú]mero)\D{0,6}(\d{1,12})"#).ok()
});

const PROMPT_CLIENT: &str = "Informe o *código do cliente* para abrir o chamado.";
const PROMPT_PROBLEM: &str = "Descreva o problema.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Priority {
    #[strum(serialize = "Baixa")]
    Low,
    #[strum(serialize = "Média")]
    Medium,
    #[strum(serialize = "Alta")]
    High,
    #[strum(serialize = "Urgente")]
    Urgent,
}

impl Priority {
    /// Value sent to the ERP (`1` to `4`).
    pub fn code(&self) -> &'static str {
        match self {
            Priority::Low => "1",
            Priority::Medium => "2",
            Priority::High => "3",
            Priority::Urgent => "4",
        }
    }

    fn menu() -> String {
        let lines: Vec<String> = Priority::iter()
            .map(|p| format!("{} - {p}", p.code()))
            .collect();
        format!("Qual a prioridade?\n{}", lines.join("\n"))
    }
}

/// Fields collected so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketDraft {
    pub requester: Option<String>,
    pub client: Option<Client>,
    pub contract: Option<Contract>,
    pub problem: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TicketCreateStep {
    #[default]
    AwaitClient,
    AwaitContract {
        contracts: Vec<Contract>,
    },
    AwaitProblem,
    AwaitPriority,
    AwaitConfirmation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketCreateDialog {
    pub step: TicketCreateStep,
    pub draft: TicketDraft,
}

impl TicketCreateDialog {
    pub fn step_name(&self) -> &'static str {
        match self.step {
            TicketCreateStep::AwaitClient => "await_client",
            TicketCreateStep::AwaitContract { .. } => "await_contract",
            TicketCreateStep::AwaitProblem => "await_problem",
            TicketCreateStep::AwaitPriority => "await_priority",
            TicketCreateStep::AwaitConfirmation => "await_confirmation",
        }
    }

    pub fn is_initial(&self) -> bool {
        self.step == TicketCreateStep::AwaitClient
    }

    pub fn is_confirmation(&self) -> bool {
        self.step == TicketCreateStep::AwaitConfirmation
    }

    fn at(mut self, step: TicketCreateStep) -> Self {
        self.step = step;
        self
    }
}

fn describe_contract(contract: &Contract) -> String {
    match contract.available_hours {
        Some(h) => format!("{} ({h:.1} h disponíveis)", contract.description),
        None => contract.description.clone(),
    }
}

fn contract_menu(contracts: &[Contract]) -> String {
    let lines: Vec<String> = contracts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} - {}", i + 1, describe_contract(c)))
        .collect();
    format!("Escolha o contrato:\n{}", lines.join("\n"))
}

fn summary(draft: &TicketDraft) -> Option<String> {
    let client = draft.client.as_ref()?;
    let problem = draft.problem.as_ref()?;
    let priority = draft.priority?;
    let contract = draft
        .contract
        .as_ref()
        .map(|c| format!("\nContrato: {}", c.description))
        .unwrap_or_default();
    Some(format!(
        "Confira os dados do chamado:\nCliente: {} ({}){contract}\nProblema: {problem}\nPrioridade: {priority}\n\n{}",
        client.name,
        client.code,
        copy::CONFIRM_HINT
    ))
}

fn success(reference: Option<&str>) -> String {
    match reference {
        Some(id) => format!("Chamado aberto com sucesso! Número: *{id}*."),
        None => "Chamado aberto com sucesso!".to_string(),
    }
}

/// Best-effort ticket number from an ERP error body.
pub fn recover_ticket_id(body: &str) -> Option<String> {
    let re = TICKET_IN_BODY.as_ref()?;
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct TicketCreateEngine {
    erp: Arc<dyn ErpClient>,
    keywords: Arc<Keywords>,
}

impl TicketCreateEngine {
    pub fn new(erp: Arc<dyn ErpClient>, keywords: Arc<Keywords>) -> Self {
        Self { erp, keywords }
    }

    pub fn start(&self, profile: &Contact) -> Turn<TicketCreateDialog> {
        let requester = if profile.name.trim().is_empty() {
            profile.address.clone()
        } else {
            profile.name.clone()
        };
        let dialog = TicketCreateDialog {
            step: TicketCreateStep::AwaitClient,
            draft: TicketDraft {
                requester: Some(requester),
                ..Default::default()
            },
        };
        Turn::stay(dialog, PROMPT_CLIENT)
    }

    pub async fn advance(
        &self,
        dialog: TicketCreateDialog,
        input: &str,
        _ctx: &TurnContext,
    ) -> Turn<TicketCreateDialog> {
        if self.keywords.is_cancel(input) {
            return Turn::finish(copy::CANCELLED);
        }
        let text = input.trim();
        match dialog.step.clone() {
            TicketCreateStep::AwaitClient => self.on_client(dialog, text).await,
            TicketCreateStep::AwaitContract { contracts } => match parse_choice(text, contracts.len()) {
                Some(i) => {
                    let mut next = dialog.at(TicketCreateStep::AwaitProblem);
                    next.draft.contract = contracts.get(i).cloned();
                    Turn::stay(next, PROMPT_PROBLEM)
                }
                None => {
                    let menu = contract_menu(&contracts);
                    Turn::stay(dialog, format!("Opção inválida.\n{menu}"))
                }
            },
            TicketCreateStep::AwaitProblem => {
                if text.chars().count() < 3 {
                    return Turn::stay(dialog, PROMPT_PROBLEM);
                }
                let mut next = dialog.at(TicketCreateStep::AwaitPriority);
                next.draft.problem = Some(text.to_string());
                Turn::stay(next, Priority::menu())
            }
            TicketCreateStep::AwaitPriority => {
                let Some(priority) = parse_choice(text, 4).and_then(|i| Priority::iter().nth(i))
                else {
                    return Turn::stay(dialog, format!("Opção inválida.\n{}", Priority::menu()));
                };
                let mut next = dialog.at(TicketCreateStep::AwaitConfirmation);
                next.draft.priority = Some(priority);
                match summary(&next.draft) {
                    Some(text) => Turn::stay(next, text),
                    None => Turn::reply(copy::RESTART, Next::Abort),
                }
            }
            TicketCreateStep::AwaitConfirmation => {
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

    async fn on_client(&self, dialog: TicketCreateDialog, code: &str) -> Turn<TicketCreateDialog> {
        if code.is_empty() {
            return Turn::stay(dialog, PROMPT_CLIENT);
        }
        let client = match self.erp.find_client(code).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                return Turn::stay(
                    dialog,
                    format!("Cliente *{code}* não encontrado. Verifique o código e envie novamente."),
                );
            }
            Err(e) => {
                warn!(client = %code, error = %e, "client lookup failed");
                return Turn::stay(dialog, copy::APOLOGY);
            }
        };
        let contracts = match self.erp.active_contracts(&client.code).await {
            Ok(contracts) => contracts,
            Err(e) => {
                warn!(client = %client.code, error = %e, "contract lookup failed");
                return Turn::stay(dialog, copy::APOLOGY);
            }
        };

        let header = format!("Cliente: *{}*", client.name);
        let mut next = dialog;
        next.draft.client = Some(client);
        match contracts.len() {
            0 | 1 => {
                let contract_line = contracts
                    .first()
                    .map(|c| format!("\nContrato: {}", describe_contract(c)))
                    .unwrap_or_default();
                next.draft.contract = contracts.into_iter().next();
                let next = next.at(TicketCreateStep::AwaitProblem);
                Turn::stay(next, format!("{header}{contract_line}\n\n{PROMPT_PROBLEM}"))
            }
            _ => {
                let menu = contract_menu(&contracts);
                let next = next.at(TicketCreateStep::AwaitContract { contracts });
                Turn::stay(next, format!("{header}\n\n{menu}"))
            }
        }
    }

    async fn submit(&self, draft: TicketDraft) -> Turn<TicketCreateDialog> {
        let (Some(client), Some(problem), Some(priority)) =
            (draft.client, draft.problem, draft.priority)
        else {
            return Turn::reply(copy::RESTART, Next::Abort);
        };
        let ticket = NewTicket {
            client_code: client.code.clone(),
            contract_id: draft.contract.map(|c| c.id),
            priority: priority.code().to_string(),
            problem,
            requester: draft.requester,
        };
        match self.erp.create_ticket(&ticket).await {
            Ok(reference) => {
                info!(client = %client.code, ticket = %reference.id, "ticket created");
                Turn::finish(success(Some(&reference.id)))
            }
            Err(e) if e.is_server_error() => {
                let (status, body) = match &e {
                    FieldopsError::Erp { status, body, .. } => (*status, body.clone()),
                    _ => (None, None),
                };
                let recovered = body.as_deref().and_then(recover_ticket_id);
                warn!(
                    anomaly = "masked_erp_failure",
                    client = %client.code,
                    status = ?status,
                    recovered_ticket = ?recovered,
                    error = %e,
                    "ticket creation failed with a server error; user was told it succeeded"
                );
                Turn::finish(success(recovered.as_deref()))
            }
            Err(e) => {
                error!(client = %client.code, error = %e, "ticket creation failed");
                Turn::finish(copy::APOLOGY)
            }
        }
    }
}
