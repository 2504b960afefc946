// DANS : src/rpc/mod.rs

//! Accès au ledger : la seule frontière réseau du sniper.
//! Tout le reste du crate dépend du trait `LedgerClient`, jamais des clients Solana.

pub mod ledger;
pub mod resilient_client;

pub use ledger::SolanaLedger;
pub use resilient_client::ResilientRpcClient;

use crate::decoders::spl_token_decoders::mint::MintAccount;
use crate::decoders::transaction::ParsedTransaction;
use crate::execution::swap_builder::SwapTransaction;
use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;
use tokio::sync::mpsc;

/// Code JSON-RPC "invalid params", renvoyé notamment pour un compte inexistant.
pub const ACCOUNT_NOT_FOUND_CODE: i64 = -32602;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("compte introuvable (code {code})")]
    AccountNotFound { code: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Une notification de log pour une transaction qui mentionne le programme surveillé.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogNotification {
    pub signature: Signature,
    /// Erreur d'exécution de la transaction, le cas échéant.
    pub err: Option<String>,
    pub logs: Vec<String>,
}

/// Un abonnement actif. L'identifiant sert à `logs_unsubscribe`.
#[derive(Debug)]
pub struct LogSubscription {
    pub id: u64,
    pub notifications: mpsc::Receiver<LogNotification>,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// S'abonne aux logs des transactions mentionnant `program_id` (commitment `confirmed`).
    async fn logs_subscribe(&self, program_id: &Pubkey) -> Result<LogSubscription>;

    /// Annule un abonnement. Un identifiant inconnu n'est pas une erreur.
    async fn logs_unsubscribe(&self, subscription_id: u64) -> Result<()>;

    /// Transaction confirmée en encodage `jsonParsed`, `None` si elle n'existe pas (encore).
    async fn fetch_transaction(&self, signature: &Signature) -> Result<Option<ParsedTransaction>>;

    async fn fetch_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Compte mint décodé, `None` si le compte n'existe pas.
    async fn fetch_mint_account(&self, mint: &Pubkey) -> Result<Option<MintAccount>>;

    /// Supply brute d'un mint.
    async fn fetch_token_supply(&self, mint: &Pubkey) -> Result<u64, RpcError>;

    /// Diffuse la transaction et attend sa confirmation dans sa fenêtre de validité.
    async fn send_and_confirm(&self, transaction: &SwapTransaction) -> Result<Signature>;
}
