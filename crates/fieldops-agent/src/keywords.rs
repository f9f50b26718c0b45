// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword detection for the conversation router.
//!
//! Matching folds case and accents, then compares whole words: `chamado`
//! matches "abrir um chamado!" but not "chamados". Cancellation is stricter:
//! the whole message must be a cancel phrase, so free text such as "não
//! consigo sair do sistema" is still an answer.

use fieldops_config::model::KeywordsConfig;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::dialog::DialogKind;

const DEFAULT_CANCEL: &[&str] = &["cancelar", "cancela", "sair", "parar"];
const DEFAULT_INTERVENTION: &[&str] = &["intervenção", "intervencao", "atendimento"];
const DEFAULT_TICKET_CLOSE: &[&str] = &["fechar chamado", "encerrar chamado", "finalizar chamado"];
const DEFAULT_TICKET_CREATE: &[&str] = &["abrir chamado", "novo chamado", "criar chamado", "chamado"];
const DEFAULT_PUNCH: &[&str] = &["ponto", "bater ponto", "registrar ponto"];

/// NFKD-decompose, drop combining marks, lowercase.
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn words(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// A keyword already split into folded words.
#[derive(Debug, Clone)]
struct Phrase(Vec<String>);

impl Phrase {
    fn found_in(&self, haystack: &[String]) -> bool {
        !self.0.is_empty() && haystack.windows(self.0.len()).any(|w| w == self.0.as_slice())
    }

    fn is_whole(&self, haystack: &[String]) -> bool {
        !self.0.is_empty() && self.0.as_slice() == haystack
    }
}

fn phrases(configured: &[String], defaults: &[&str]) -> Vec<Phrase> {
    let source: Vec<&str> = if configured.is_empty() {
        defaults.to_vec()
    } else {
        configured.iter().map(String::as_str).collect()
    };
    source.into_iter().map(|k| Phrase(words(k))).collect()
}

/// Keyword lists for cancellation and each dialog kind.
#[derive(Debug, Clone)]
pub struct Keywords {
    cancel: Vec<Phrase>,
    /// Checked in this order; the first kind with a hit wins.
    kinds: Vec<(DialogKind, Vec<Phrase>)>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self::from_config(&KeywordsConfig::default())
    }
}

impl Keywords {
    /// Build from config; empty lists fall back to the Portuguese defaults.
    pub fn from_config(config: &KeywordsConfig) -> Self {
        Self {
            cancel: phrases(&config.cancel, DEFAULT_CANCEL),
            kinds: vec![
                (
                    DialogKind::Intervention,
                    phrases(&config.intervention, DEFAULT_INTERVENTION),
                ),
                (
                    DialogKind::TicketClose,
                    phrases(&config.ticket_close, DEFAULT_TICKET_CLOSE),
                ),
                (
                    DialogKind::TicketCreate,
                    phrases(&config.ticket_create, DEFAULT_TICKET_CREATE),
                ),
                (DialogKind::Punch, phrases(&config.punch, DEFAULT_PUNCH)),
            ],
        }
    }

    /// True only when the entire message is a cancel phrase.
    pub fn is_cancel(&self, text: &str) -> bool {
        let haystack = words(text);
        self.cancel.iter().any(|p| p.is_whole(&haystack))
    }

    /// The highest-priority dialog kind whose keyword appears in `text`.
    pub fn detect(&self, text: &str) -> Option<DialogKind> {
        let haystack = words(text);
        self.kinds
            .iter()
            .find(|(_, list)| list.iter().any(|p| p.found_in(&haystack)))
            .map(|(kind, _)| *kind)
    }
}

/// Affirmative confirmation (`sim`, `s`).
pub fn is_yes(text: &str) -> bool {
    matches!(fold(text.trim()).as_str(), "sim" | "s")
}

/// Negative confirmation (`não`, `nao`, `n`).
pub fn is_no(text: &str) -> bool {
    matches!(fold(text.trim()).as_str(), "nao" | "n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_accents() {
        assert_eq!(fold("INTERVENÇÃO Técnica"), "intervencao tecnica");
    }

    #[test]
    fn folds_decomposed_input() {
        // "intervenção" typed as base letters plus combining marks.
        let decomposed = "intervenc\u{0327}a\u{0303}o";
        assert_eq!(fold(decomposed), "intervencao");
        assert_eq!(
            Keywords::default().detect(decomposed),
            Some(DialogKind::Intervention)
        );
        assert!(is_no("na\u{0303}o"));
    }

    #[test]
    fn detects_kind_on_word_boundaries() {
        let k = Keywords::default();
        assert_eq!(k.detect("Quero abrir um chamado!"), Some(DialogKind::TicketCreate));
        assert_eq!(k.detect("chamados antigos"), None);
        assert_eq!(k.detect("PONTO"), Some(DialogKind::Punch));
        assert_eq!(k.detect("apontamento"), None);
    }

    #[test]
    fn priority_order_is_fixed() {
        let k = Keywords::default();
        // "fechar chamado" also contains "chamado": closure outranks creation.
        assert_eq!(k.detect("fechar chamado"), Some(DialogKind::TicketClose));
        assert_eq!(
            k.detect("atendimento do chamado e ponto"),
            Some(DialogKind::Intervention)
        );
        assert_eq!(k.detect("Intervenção"), Some(DialogKind::Intervention));
    }

    #[test]
    fn cancel_keywords() {
        let k = Keywords::default();
        assert!(k.is_cancel("Cancelar"));
        assert!(k.is_cancel("  sair! "));
        assert!(!k.is_cancel("cancelamento"));
    }

    #[test]
    fn cancel_words_inside_free_text_are_not_a_cancel() {
        let k = Keywords::default();
        assert!(!k.is_cancel("usuario nao consegue sair do sistema"));
        assert!(!k.is_cancel("precisei parar o servidor"));
        assert!(!k.is_cancel("quero cancelar"));
    }

    #[test]
    fn config_overrides_defaults() {
        let config = KeywordsConfig {
            punch: vec!["marcar presença".into()],
            ..Default::default()
        };
        let k = Keywords::from_config(&config);
        assert_eq!(k.detect("marcar presenca"), Some(DialogKind::Punch));
        assert_eq!(k.detect("ponto"), None);
        // Other kinds keep their defaults.
        assert_eq!(k.detect("novo chamado"), Some(DialogKind::TicketCreate));
    }

    #[test]
    fn confirmations() {
        assert!(is_yes(" Sim "));
        assert!(is_yes("s"));
        assert!(is_no("NÃO"));
        assert!(is_no("nao"));
        assert!(!is_yes("simples"));
    }
}
