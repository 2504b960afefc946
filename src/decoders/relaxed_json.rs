// DANS : src/decoders/relaxed_json.rs

//! Lecture des fragments "JSON relâché" écrits dans les logs du programme AMM,
//! par exemple `{nonce: 254, open_time: 1700000000, init_pc_amount: 5000, init_coin_amount: 7000}`.
//! Les clés ne sont pas entre guillemets : on les cite avant de passer le texte à `serde_json`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedLogFragment {
    #[error("aucune accolade ouvrante dans l'entrée de log")]
    MissingOpeningBrace,
    #[error("fragment invalide après réécriture des clés : {0}")]
    InvalidSyntax(#[from] serde_json::Error),
}

/// Les informations d'initialisation que le programme AMM écrit dans ses logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpInitLogEntry {
    pub nonce: u64,
    pub open_time: u64,
    pub init_pc_amount: u64,
    pub init_coin_amount: u64,
}

/// Extrait et parse le fragment qui commence à la première `{` de la ligne.
pub fn parse_lp_init_log_entry(log_line: &str) -> Result<LpInitLogEntry, MalformedLogFragment> {
    let start = log_line.find('{').ok_or(MalformedLogFragment::MissingOpeningBrace)?;
    parse_relaxed(&log_line[start..])
}

/// Parse un fragment relâché vers n'importe quel type désérialisable.
pub fn parse_relaxed<T: DeserializeOwned>(fragment: &str) -> Result<T, MalformedLogFragment> {
    if !fragment.trim_start().starts_with('{') {
        return Err(MalformedLogFragment::MissingOpeningBrace);
    }
    let strict = quote_bare_keys(fragment);
    Ok(serde_json::from_str(&strict)?)
}

/// Met entre guillemets chaque identifiant nu placé en position de clé,
/// c'est-à-dire après `{` ou `,` et suivi de `:`. Le contenu des chaînes
/// déjà citées n'est jamais touché.
pub fn quote_bare_keys(fragment: &str) -> String {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::with_capacity(fragment.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    // Dernier caractère significatif (hors espaces) émis en dehors d'une chaîne.
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                last_significant = Some('"');
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        let key_position = matches!(last_significant, Some('{') | Some(','));
        if key_position && is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();

            let mut lookahead = i;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }

            if lookahead < chars.len() && chars[lookahead] == ':' {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            last_significant = ident.chars().last();
            continue;
        }

        out.push(c);
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        i += 1;
    }

    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
