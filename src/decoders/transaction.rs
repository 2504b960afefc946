// DANS : src/decoders/transaction.rs

//! Vue normalisée d'une transaction récupérée en encodage `jsonParsed`.
//! Les décodeurs travaillent sur cette structure plutôt que sur les types RPC,
//! ce qui permet de construire des fixtures sans passer par le réseau.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage,
    UiParsedInstruction, UiTransactionTokenBalance,
};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub signature: Signature,
    pub instructions: Vec<TopLevelInstruction>,
    pub inner_instructions: Vec<InnerInstructionGroup>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
}

/// Instruction de premier niveau. Les comptes ne sont connus que pour les
/// instructions partiellement décodées (programmes inconnus du nœud RPC).
#[derive(Debug, Clone)]
pub struct TopLevelInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
}

#[derive(Debug, Clone)]
pub struct InnerInstructionGroup {
    /// Index de l'instruction parente.
    pub index: u8,
    pub instructions: Vec<InnerInstruction>,
}

#[derive(Debug, Clone)]
pub struct InnerInstruction {
    pub program_id: Pubkey,
    /// Le champ `type` du format parsé (`transfer`, `mintTo`, ...), absent si non parsé.
    pub kind: Option<String>,
    /// Le champ `info`, sans schéma garanti.
    pub info: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub owner: Option<Pubkey>,
    pub amount: u64,
    pub decimals: u8,
}

impl ParsedTransaction {
    /// Toutes les instructions internes, tous parents confondus.
    pub fn all_inner_instructions(&self) -> impl Iterator<Item = &InnerInstruction> {
        self.inner_instructions.iter().flat_map(|group| group.instructions.iter())
    }

    pub fn find_log_entry(&self, needle: &str) -> Option<&str> {
        find_log_entry(&self.log_messages, needle)
    }

    /// Solde post-transaction d'un propriétaire pour un mint donné.
    pub fn post_balance_of(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        self.post_token_balances
            .iter()
            .find(|balance| balance.owner.as_ref() == Some(owner) && balance.mint == *mint)
            .map(|balance| balance.amount)
    }
}

impl InnerInstruction {
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Lit un champ adresse de `info`.
    pub fn info_pubkey(&self, field: &str) -> Option<Pubkey> {
        self.info.get(field)?.as_str().and_then(|s| Pubkey::from_str(s).ok())
    }

    /// Lit un montant de `info`. Le format parsé les écrit en chaîne, on accepte aussi les nombres.
    pub fn info_amount(&self, field: &str) -> Option<u64> {
        match self.info.get(field)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

pub fn find_log_entry<'a>(logs: &'a [String], needle: &str) -> Option<&'a str> {
    logs.iter().find(|line| line.contains(needle)).map(String::as_str)
}

impl TryFrom<EncodedConfirmedTransactionWithStatusMeta> for ParsedTransaction {
    type Error = anyhow::Error;

    fn try_from(value: EncodedConfirmedTransactionWithStatusMeta) -> Result<Self> {
        let encoded = value.transaction;
        let EncodedTransaction::Json(ui_transaction) = encoded.transaction else {
            bail!("La transaction n'est pas encodée en jsonParsed");
        };
        let UiMessage::Parsed(message) = ui_transaction.message else {
            bail!("Le message de la transaction n'est pas parsé");
        };
        let signature = ui_transaction
            .signatures
            .first()
            .ok_or_else(|| anyhow!("Transaction sans signature"))
            .and_then(|s| Signature::from_str(s).context("Signature illisible"))?;

        let instructions = message.instructions.iter().filter_map(top_level_from_ui).collect();

        let meta = encoded.meta.ok_or_else(|| anyhow!("Transaction {} sans meta", signature))?;

        let inner: Option<Vec<_>> = meta.inner_instructions.into();
        let inner_instructions = inner
            .unwrap_or_default()
            .into_iter()
            .map(|group| InnerInstructionGroup {
                index: group.index,
                instructions: group.instructions.iter().filter_map(inner_from_ui).collect(),
            })
            .collect();

        let pre: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
        let post: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();
        let logs: Option<Vec<String>> = meta.log_messages.into();

        Ok(Self {
            signature,
            instructions,
            inner_instructions,
            pre_token_balances: pre.unwrap_or_default().iter().filter_map(balance_from_ui).collect(),
            post_token_balances: post.unwrap_or_default().iter().filter_map(balance_from_ui).collect(),
            log_messages: logs.unwrap_or_default(),
        })
    }
}

fn top_level_from_ui(instruction: &UiInstruction) -> Option<TopLevelInstruction> {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(ix)) => Some(TopLevelInstruction {
            program_id: Pubkey::from_str(&ix.program_id).ok()?,
            accounts: ix.accounts.iter().filter_map(|a| Pubkey::from_str(a).ok()).collect(),
        }),
        UiInstruction::Parsed(UiParsedInstruction::Parsed(ix)) => Some(TopLevelInstruction {
            program_id: Pubkey::from_str(&ix.program_id).ok()?,
            accounts: Vec::new(),
        }),
        // Un message parsé ne contient pas d'instructions compilées.
        UiInstruction::Compiled(_) => None,
    }
}

fn inner_from_ui(instruction: &UiInstruction) -> Option<InnerInstruction> {
    match instruction {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(ix)) => Some(InnerInstruction {
            program_id: Pubkey::from_str(&ix.program_id).ok()?,
            kind: ix.parsed.get("type").and_then(Value::as_str).map(str::to_owned),
            info: ix.parsed.get("info").cloned().unwrap_or(Value::Null),
        }),
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(ix)) => Some(InnerInstruction {
            program_id: Pubkey::from_str(&ix.program_id).ok()?,
            kind: None,
            info: Value::Null,
        }),
        UiInstruction::Compiled(_) => None,
    }
}

fn balance_from_ui(balance: &UiTransactionTokenBalance) -> Option<TokenBalance> {
    let owner: Option<String> = balance.owner.clone().into();
    Some(TokenBalance {
        account_index: balance.account_index,
        mint: Pubkey::from_str(&balance.mint).ok()?,
        owner: owner.and_then(|o| Pubkey::from_str(&o).ok()),
        amount: balance.ui_token_amount.amount.parse().ok()?,
        decimals: balance.ui_token_amount.decimals,
    })
}
