// DANS : src/rpc/resilient_client.rs

use crate::monitoring::metrics::{RPC_REQUESTS_TOTAL, RPC_REQUEST_LATENCY};
use anyhow::{Context, Result};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig},
    rpc_request::RpcError as ClientRpcError,
};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::warn;

use super::ACCOUNT_NOT_FOUND_CODE;

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les appels RPC qui échouent à cause d'erreurs réseau temporaires.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    max_retries: u8,
    delay_ms: u64,
}

impl ResilientRpcClient {
    /// Construit un client au commitment `confirmed`.
    pub fn new(rpc_url: String, max_retries: u8, delay_ms: u64) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed())),
            max_retries,
            delay_ms,
        }
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.client.commitment()
    }

    /// Détermine si une erreur du client est temporaire et si une nouvelle tentative doit être effectuée.
    /// Un "invalid params" est une réponse définitive du nœud, pas une panne.
    fn is_retryable(error: &ClientError) -> bool {
        match &error.kind {
            ClientErrorKind::RpcError(ClientRpcError::RpcResponseError { code, .. }) => *code != ACCOUNT_NOT_FOUND_CODE,
            ClientErrorKind::Reqwest(_) | ClientErrorKind::RpcError(_) | ClientErrorKind::Io(_) => true,
            _ => false,
        }
    }

    /// Exécute `op` avec ré-essais et instrumente l'appel.
    async fn call<T, F, Fut>(&self, method: &'static str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let _timer = RPC_REQUEST_LATENCY.with_label_values(&[method]).start_timer();
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "success"]).inc();
                    return Ok(value);
                }
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(method, attempt, error = %e, "Appel RPC en échec, nouvelle tentative.");
                    sleep(Duration::from_millis(self.delay_ms)).await;
                }
                Err(e) => {
                    RPC_REQUESTS_TOTAL.with_label_values(&[method, "failure"]).inc();
                    return Err(e);
                }
            }
        }
    }

    /// Récupère une transaction confirmée en `jsonParsed`, transactions versionnées comprises.
    pub async fn get_transaction(&self, signature: &Signature) -> Result<EncodedConfirmedTransactionWithStatusMeta> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };
        self.call("get_transaction", || self.client.get_transaction_with_config(signature, config.clone()))
            .await
            .with_context(|| format!("Échec final de get_transaction pour {}", signature))
    }

    /// Récupère un compte, `None` s'il n'existe pas.
    pub async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>> {
        let commitment = self.commitment();
        self.call("get_account", || self.client.get_account_with_commitment(pubkey, commitment))
            .await
            .map(|response| response.value)
            .with_context(|| format!("Échec final de get_account pour {}", pubkey))
    }

    /// Supply brute d'un mint.
    pub async fn get_token_supply(&self, mint: &Pubkey) -> Result<u64> {
        let amount = self
            .call("get_token_supply", || self.client.get_token_supply(mint))
            .await
            .with_context(|| format!("Échec final de get_token_supply pour {}", mint))?;
        amount
            .amount
            .parse::<u64>()
            .with_context(|| format!("Supply illisible pour {} : {}", mint, amount.amount))
    }

    pub async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        let commitment = self.commitment();
        self.call("get_latest_blockhash", || self.client.get_latest_blockhash_with_commitment(commitment))
            .await
            .context("Échec final de get_latest_blockhash")
    }

    /// Diffuse une transaction sans simulation préalable. `max_retries` est
    /// transmis au nœud, qui la rediffuse lui-même.
    pub async fn send_transaction(&self, transaction: &VersionedTransaction, max_retries: usize) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(max_retries),
            ..RpcSendTransactionConfig::default()
        };
        self.call("send_transaction", || self.client.send_transaction_with_config(transaction, config.clone()))
            .await
            .context("Échec final de send_transaction")
    }

    /// Statut d'une signature : `None` tant qu'elle n'a pas atteint le commitment du client.
    pub async fn get_signature_status(&self, signature: &Signature) -> Result<Option<Result<(), String>>> {
        let status = self
            .call("get_signature_status", || self.client.get_signature_status(signature))
            .await
            .with_context(|| format!("Échec final de get_signature_status pour {}", signature))?;
        Ok(status.map(|result| result.map_err(|e| e.to_string())))
    }

    pub async fn get_block_height(&self) -> Result<u64> {
        self.call("get_block_height", || self.client.get_block_height())
            .await
            .context("Échec final de get_block_height")
    }
}

/// Vrai si l'erreur (éventuellement enveloppée dans un contexte) est un "invalid params" du nœud.
pub fn is_account_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ClientError>().map(|e| &e.kind),
        Some(ClientErrorKind::RpcError(ClientRpcError::RpcResponseError { code, .. })) if *code == ACCOUNT_NOT_FOUND_CODE
    )
}

/// Vrai si le nœud a répondu `null` là où une transaction était attendue.
pub fn is_null_result(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ClientError>().map(|e| &e.kind),
        Some(ClientErrorKind::SerdeJson(_))
    )
}
