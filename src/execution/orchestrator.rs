// DANS : src/execution/orchestrator.rs

//! Pipeline achat → attente du règlement → vente, une instance par pool.

use crate::config::TradeSettings;
use crate::decoders::raydium::amm_v4::PoolDescriptor;
use crate::execution::swap_builder::SwapBuilder;
use crate::execution::swap_config::SwapConfig;
use crate::monitoring::metrics::SELL_ATTEMPTS;
use crate::rpc::LedgerClient;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Discovered,
    Buying,
    AwaitingSettlement,
    Selling,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Discovered => "discovered",
            PipelineStage::Buying => "buying",
            PipelineStage::AwaitingSettlement => "awaiting_settlement",
            PipelineStage::Selling => "selling",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("construction du swap impossible : {0:#}")]
    Build(anyhow::Error),
    #[error("diffusion ou confirmation en échec : {0:#}")]
    Broadcast(anyhow::Error),
    #[error("règlement de l'achat introuvable : {0}")]
    Settlement(String),
    #[error("vente abandonnée après {attempts} tentatives, dernière erreur : {last}")]
    RetriesExhausted { attempts: u32, last: Box<SwapError> },
}

/// Cycle de vie d'une pool dans le pipeline. Les étapes ne sont jamais revisitées.
#[derive(Debug)]
pub struct PipelineRun {
    pub descriptor: Arc<PoolDescriptor>,
    pub stage: PipelineStage,
    pub history: Vec<PipelineStage>,
    pub sell_attempts: u32,
    pub buy_signature: Option<Signature>,
    pub received_amount: Option<u64>,
    pub sell_signature: Option<Signature>,
    /// Étape en cours au moment de l'échec.
    pub failed_during: Option<PipelineStage>,
    pub error: Option<SwapError>,
}

impl PipelineRun {
    pub fn new(descriptor: Arc<PoolDescriptor>) -> Self {
        Self {
            descriptor,
            stage: PipelineStage::Discovered,
            history: vec![PipelineStage::Discovered],
            sell_attempts: 0,
            buy_signature: None,
            received_amount: None,
            sell_signature: None,
            failed_during: None,
            error: None,
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        self.stage = stage;
        self.history.push(stage);
    }

    fn fail(&mut self, error: SwapError) {
        self.failed_during = Some(self.stage);
        self.error = Some(error);
        self.advance(PipelineStage::Failed);
    }

    /// Libellé de l'état terminal, pour les métriques.
    pub fn outcome_label(&self) -> &'static str {
        match (self.stage, self.failed_during) {
            (PipelineStage::Done, _) => "done",
            (PipelineStage::Failed, Some(PipelineStage::Buying)) => "failed_buying",
            (PipelineStage::Failed, Some(PipelineStage::AwaitingSettlement)) => "failed_settlement",
            (PipelineStage::Failed, Some(PipelineStage::Selling)) => "failed_selling",
            (PipelineStage::Failed, _) => "failed",
            _ => "unfinished",
        }
    }
}

pub struct SwapOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    swap_builder: Arc<dyn SwapBuilder>,
    trade: TradeSettings,
    payer: Pubkey,
    reports: mpsc::UnboundedSender<PipelineRun>,
}

impl SwapOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        swap_builder: Arc<dyn SwapBuilder>,
        trade: TradeSettings,
        payer: Pubkey,
        reports: mpsc::UnboundedSender<PipelineRun>,
    ) -> Self {
        Self { ledger, swap_builder, trade, payer, reports }
    }

    /// L'actif dépensé à l'achat et récupéré à la vente.
    pub fn spend_mint(&self) -> Pubkey {
        self.trade.spend_mint
    }

    /// Lance le pipeline dans sa propre tâche. Le résultat part au superviseur.
    pub fn launch(self: &Arc<Self>, descriptor: Arc<PoolDescriptor>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let run = orchestrator.run(descriptor).await;
            if orchestrator.reports.send(run).is_err() {
                warn!("Aucun superviseur pour recevoir le résultat du pipeline.");
            }
        })
    }

    /// Exécute le pipeline complet. Ne panique pas et ne propage rien :
    /// toute erreur termine la run dans l'état `Failed`.
    #[instrument(name = "pipeline", skip_all, fields(pool = %descriptor.id))]
    pub async fn run(&self, descriptor: Arc<PoolDescriptor>) -> PipelineRun {
        let mut run = PipelineRun::new(Arc::clone(&descriptor));

        run.advance(PipelineStage::Buying);
        let buy_config = SwapConfig::buy(&descriptor, &self.trade);
        info!(mint = %buy_config.output_mint, amount = buy_config.amount, "Achat du token lancé.");
        let buy_signature = match self.swap(&descriptor, &buy_config).await {
            Ok(signature) => signature,
            Err(e) => {
                error!(error = %e, "Échec de l'achat, pipeline abandonné.");
                run.fail(e);
                return run;
            }
        };
        run.buy_signature = Some(buy_signature);
        info!(signature = %buy_signature, "Achat confirmé.");

        run.advance(PipelineStage::AwaitingSettlement);
        let received = match self.await_settlement(&descriptor, &buy_signature).await {
            Ok(amount) => amount,
            Err(e) => {
                error!(error = %e, "Impossible de lire le solde reçu, pipeline abandonné.");
                run.fail(e);
                return run;
            }
        };
        run.received_amount = Some(received);
        info!(received, "Solde reçu, début de la vente.");

        run.advance(PipelineStage::Selling);
        let sell_config = SwapConfig::sell(&descriptor, &self.trade, received);
        match self.sell_with_retry(&descriptor, &sell_config, &mut run).await {
            Ok(signature) => {
                run.sell_signature = Some(signature);
                run.advance(PipelineStage::Done);
                info!(signature = %signature, attempts = run.sell_attempts, "Vente confirmée.");
            }
            Err(e) => {
                error!(error = %e, "Vente définitivement en échec.");
                run.fail(e);
            }
        }
        run
    }

    async fn swap(&self, pool: &PoolDescriptor, config: &SwapConfig) -> Result<Signature, SwapError> {
        let transaction = self
            .swap_builder
            .build_swap(pool, config)
            .await
            .map_err(SwapError::Build)?;
        self.ledger
            .send_and_confirm(&transaction)
            .await
            .map_err(SwapError::Broadcast)
    }

    /// Attend le délai de règlement puis lit le solde post-transaction du payer
    /// pour le token acheté, dans le reçu de l'achat.
    async fn await_settlement(&self, pool: &PoolDescriptor, buy_signature: &Signature) -> Result<u64, SwapError> {
        sleep(self.trade.settlement_delay).await;

        let target = pool.target_mint();
        let transaction = self
            .ledger
            .fetch_transaction(buy_signature)
            .await
            .map_err(|e| SwapError::Settlement(format!("{:#}", e)))?
            .ok_or_else(|| SwapError::Settlement(format!("transaction d'achat {} introuvable", buy_signature)))?;

        match transaction.post_balance_of(&self.payer, &target.mint) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(SwapError::Settlement(format!(
                "aucun solde de {} pour {} après l'achat",
                target.mint, self.payer
            ))),
        }
    }

    /// Toute erreur de construction ou de diffusion est ré-essayée ; le délai
    /// avant la tentative `n + 1` vaut `n × délai de base`.
    async fn sell_with_retry(&self, pool: &PoolDescriptor, config: &SwapConfig, run: &mut PipelineRun) -> Result<Signature, SwapError> {
        let max_attempts = self.trade.sell_max_attempts.max(1);
        let mut attempt = 1;
        loop {
            run.sell_attempts = attempt;
            SELL_ATTEMPTS.inc();
            match self.swap(pool, config).await {
                Ok(signature) => return Ok(signature),
                Err(e) if attempt < max_attempts => {
                    let delay = self.trade.sell_retry_base_delay * attempt;
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Échec de la vente, nouvelle tentative."
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(SwapError::RetriesExhausted { attempts: attempt, last: Box::new(e) });
                }
            }
        }
    }
}
