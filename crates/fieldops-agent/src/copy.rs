// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing copy shared across flows. The audience is Brazilian, so all
//! replies are in Portuguese.

use crate::auth::DenialReason;

pub const CANCELLED: &str = "Operação cancelada.";

pub const APOLOGY: &str =
    "Desculpe, não consegui falar com o sistema agora. Tente novamente em instantes.";

pub const RESTART: &str =
    "Algo saiu do esperado e a conversa foi reiniciada. Envie a palavra-chave para começar de novo.";

pub const SESSION_EXPIRED: &str =
    "Sua conversa foi encerrada por falta de resposta. Envie a palavra-chave para recomeçar.";

pub const LOCATION_REPROMPT: &str = "Estou aguardando sua localização para registrar o ponto. \
     Envie a localização pelo aplicativo ou digite *cancelar*.";

pub const CONFIRM_HINT: &str = "Responda *sim* para confirmar ou *não* para cancelar.";

const HELP_TICKETS: &str = "• *abrir chamado* para abrir um chamado\n\
     • *fechar chamado* para encerrar um chamado\n\
     • *intervenção* para registrar um atendimento";

const HELP_PUNCH: &str = "• *ponto* para registrar entrada ou saída";

/// Help text scoped to what the sender may do; `None` means stay silent.
pub fn help(tickets: bool, punch: bool) -> Option<String> {
    let body = match (tickets, punch) {
        (true, true) => format!("{HELP_TICKETS}\n{HELP_PUNCH}"),
        (true, false) => HELP_TICKETS.to_string(),
        (false, true) => HELP_PUNCH.to_string(),
        (false, false) => return None,
    };
    Some(format!("Olá! Posso ajudar com:\n{body}\n\nDigite *cancelar* a qualquer momento."))
}

pub fn denial(reason: DenialReason) -> &'static str {
    match reason {
        DenialReason::UnknownSender => "Seu número não está cadastrado para usar este serviço.",
        DenialReason::MissingCapability => "Você não tem permissão para esta operação.",
        DenialReason::NotYetValid => "Sua autorização ainda não está vigente.",
        DenialReason::Expired => "Sua autorização expirou. Procure o administrador.",
        DenialReason::LookupFailed => {
            "Não foi possível verificar sua autorização agora. Tente novamente em instantes."
        }
    }
}
