// DANS : src/rpc/ledger.rs

use super::resilient_client::{is_account_not_found, is_null_result};
use super::{LedgerClient, LogNotification, LogSubscription, ResilientRpcClient, RpcError, ACCOUNT_NOT_FOUND_CODE};
use crate::decoders::spl_token_decoders::mint::{decode_mint, MintAccount};
use crate::decoders::transaction::ParsedTransaction;
use crate::execution::swap_builder::SwapTransaction;
use crate::monitoring::metrics::TRANSACTIONS_SENT;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter},
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    time::sleep,
};
use tracing::{debug, info, warn};

const NOTIFICATION_BUFFER: usize = 1024;
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Implémentation réelle du `LedgerClient` : HTTP via `ResilientRpcClient`,
/// WebSocket via un `PubsubClient` dédié par abonnement.
pub struct SolanaLedger {
    rpc: Arc<ResilientRpcClient>,
    ws_url: String,
    next_subscription_id: AtomicU64,
    subscriptions: Mutex<HashMap<u64, oneshot::Sender<()>>>,
}

impl SolanaLedger {
    pub fn new(rpc: Arc<ResilientRpcClient>, ws_url: String) -> Self {
        Self {
            rpc,
            ws_url,
            next_subscription_id: AtomicU64::new(1),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LedgerClient for SolanaLedger {
    async fn logs_subscribe(&self, program_id: &Pubkey) -> Result<LogSubscription> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFICATION_BUFFER);

        tokio::spawn(run_log_subscription(self.ws_url.clone(), *program_id, ready_tx, stop_rx, notify_tx));

        ready_rx
            .await
            .map_err(|_| anyhow!("La tâche d'abonnement s'est arrêtée avant d'être prête"))??;

        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().await.insert(id, stop_tx);
        info!(subscription_id = id, program_id = %program_id, "Abonnement aux logs actif.");

        Ok(LogSubscription { id, notifications: notify_rx })
    }

    async fn logs_unsubscribe(&self, subscription_id: u64) -> Result<()> {
        match self.subscriptions.lock().await.remove(&subscription_id) {
            // La tâche a pu s'arrêter d'elle-même, l'envoi peut échouer sans conséquence.
            Some(stop) => {
                let _ = stop.send(());
                info!(subscription_id, "Désabonnement des logs demandé.");
            }
            None => debug!(subscription_id, "Aucun abonnement actif avec cet identifiant."),
        }
        Ok(())
    }

    async fn fetch_transaction(&self, signature: &Signature) -> Result<Option<ParsedTransaction>> {
        match self.rpc.get_transaction(signature).await {
            Ok(encoded) => ParsedTransaction::try_from(encoded).map(Some),
            Err(e) if is_null_result(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.rpc.get_account(address).await?.map(|account| account.data))
    }

    async fn fetch_mint_account(&self, mint: &Pubkey) -> Result<Option<MintAccount>> {
        match self.rpc.get_account(mint).await? {
            Some(account) => decode_mint(mint, &account.owner, &account.data).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_token_supply(&self, mint: &Pubkey) -> Result<u64, RpcError> {
        self.rpc.get_token_supply(mint).await.map_err(|e| {
            if is_account_not_found(&e) {
                RpcError::AccountNotFound { code: ACCOUNT_NOT_FOUND_CODE }
            } else {
                RpcError::Other(e)
            }
        })
    }

    async fn send_and_confirm(&self, transaction: &SwapTransaction) -> Result<Signature> {
        let signature = self
            .rpc
            .send_transaction(&transaction.transaction, transaction.max_send_retries)
            .await?;
        TRANSACTIONS_SENT.inc();
        debug!(%signature, last_valid_block_height = transaction.last_valid_block_height, "Transaction diffusée, attente de confirmation.");

        loop {
            if let Some(status) = self.rpc.get_signature_status(&signature).await? {
                return status
                    .map(|_| signature)
                    .map_err(|e| anyhow!("La transaction {} a échoué : {}", signature, e));
            }
            let block_height = self.rpc.get_block_height().await?;
            if block_height > transaction.last_valid_block_height {
                bail!(
                    "Blockhash expiré (hauteur {} > {}) avant la confirmation de {}",
                    block_height,
                    transaction.last_valid_block_height,
                    signature
                );
            }
            sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }
}

/// Possède le `PubsubClient` pendant toute la durée de l'abonnement.
async fn run_log_subscription(
    ws_url: String,
    program_id: Pubkey,
    ready: oneshot::Sender<Result<()>>,
    mut stop: oneshot::Receiver<()>,
    notifications: mpsc::Sender<LogNotification>,
) {
    let client = match PubsubClient::new(&ws_url)
        .await
        .with_context(|| format!("Connexion WebSocket impossible vers {}", ws_url))
    {
        Ok(client) => client,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let filter = RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]);
    let config = RpcTransactionLogsConfig { commitment: Some(CommitmentConfig::confirmed()) };
    let (mut stream, unsubscribe) = match client
        .logs_subscribe(filter, config)
        .await
        .with_context(|| format!("Échec de l'abonnement aux logs de {}", program_id))
    {
        Ok(subscription) => subscription,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    loop {
        tokio::select! {
            _ = &mut stop => break,
            item = stream.next() => match item {
                Some(response) => {
                    let value = response.value;
                    let Ok(signature) = Signature::from_str(&value.signature) else {
                        warn!(signature = %value.signature, "Signature illisible dans une notification de logs, ignorée.");
                        continue;
                    };
                    let notification = LogNotification {
                        signature,
                        err: value.err.map(|e| format!("{:?}", e)),
                        logs: value.logs,
                    };
                    if notifications.send(notification).await.is_err() {
                        debug!("Plus aucun consommateur pour les notifications, arrêt de l'abonnement.");
                        break;
                    }
                }
                None => {
                    warn!(program_id = %program_id, "Le flux de logs WebSocket s'est terminé de manière inattendue.");
                    break;
                }
            }
        }
    }

    unsubscribe().await;
    drop(stream);
    if let Err(e) = client.shutdown().await {
        warn!(error = %e, "Fermeture du client WebSocket en erreur.");
    }
}
