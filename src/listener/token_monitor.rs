// DANS : src/listener/token_monitor.rs

//! Écoute les logs du programme AMM et déclenche décodage → filtrage → pipeline
//! pour chaque nouvelle pool. Une notification en échec n'arrête jamais l'écoute.

use crate::config::MonitorSettings;
use crate::decoders::raydium::amm_v4::{fetch_pool_descriptor, LP_INIT_LOG_MARKER};
use crate::decoders::transaction::find_log_entry;
use crate::execution::SwapOrchestrator;
use crate::filtering::{LiquidityBurnChecker, RejectionReason, TokenValidator};
use crate::monitoring::metrics::{
    DECODE_FAILURES, DUPLICATE_NOTIFICATIONS, LOG_NOTIFICATIONS_RECEIVED, MONITORING_ACTIVE, POOLS_DISCOVERED,
    POOLS_REJECTED,
};
use crate::rpc::{LedgerClient, LogNotification};
use crate::state::SeenSignatures;
use solana_sdk::signature::Signature;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("une session de surveillance est déjà active")]
    AlreadyRunning,
    #[error("abonnement aux logs impossible : {0:#}")]
    Subscribe(anyhow::Error),
}

/// État partagé entre la boucle de consommation et les traitements en vol.
struct SessionState {
    seen: Mutex<SeenSignatures>,
    discovered: AtomicU64,
    active: AtomicBool,
}

struct MonitoringSession {
    subscription_id: u64,
    state: Arc<SessionState>,
    consumer: JoinHandle<()>,
}

pub struct TokenMonitor {
    ledger: Arc<dyn LedgerClient>,
    validator: Arc<TokenValidator>,
    burn_checker: Arc<LiquidityBurnChecker>,
    orchestrator: Arc<SwapOrchestrator>,
    settings: MonitorSettings,
    session: Mutex<Option<MonitoringSession>>,
}

impl TokenMonitor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        validator: Arc<TokenValidator>,
        burn_checker: Arc<LiquidityBurnChecker>,
        orchestrator: Arc<SwapOrchestrator>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            ledger,
            validator,
            burn_checker,
            orchestrator,
            settings,
            session: Mutex::new(None),
        }
    }

    /// Ouvre une session. Refusé si une session est déjà active.
    pub async fn start(self: &Arc<Self>) -> Result<String, MonitorError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let subscription = self
            .ledger
            .logs_subscribe(&self.settings.program_id)
            .await
            .map_err(MonitorError::Subscribe)?;

        let state = Arc::new(SessionState {
            seen: Mutex::new(SeenSignatures::new(self.settings.seen_signatures_capacity)),
            discovered: AtomicU64::new(0),
            active: AtomicBool::new(true),
        });
        let consumer = tokio::spawn(Arc::clone(self).consume(subscription.notifications, Arc::clone(&state)));

        *session = Some(MonitoringSession { subscription_id: subscription.id, state, consumer });
        MONITORING_ACTIVE.set(1);
        info!(
            program_id = %self.settings.program_id,
            subscription_id = subscription.id,
            burn_check = self.settings.burn_check_enabled,
            "Surveillance des nouvelles pools démarrée."
        );
        Ok("Monitoring started".to_string())
    }

    /// Ferme la session courante. Les pipelines déjà lancés continuent. Idempotent.
    pub async fn stop(&self) -> String {
        let Some(session) = self.session.lock().await.take() else {
            return "Monitoring is not running".to_string();
        };

        session.state.active.store(false, Ordering::SeqCst);
        session.consumer.abort();
        if let Err(e) = self.ledger.logs_unsubscribe(session.subscription_id).await {
            warn!(subscription_id = session.subscription_id, error = %e, "Échec du désabonnement des logs.");
        }
        MONITORING_ACTIVE.set(0);
        let seen_signatures = session.state.seen.lock().await.len();
        info!(
            discovered = session.state.discovered.load(Ordering::SeqCst),
            seen_signatures,
            "Surveillance arrêtée."
        );
        "Monitoring stopped".to_string()
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Nombre de pools validées pendant la session courante.
    pub async fn discovered_count(&self) -> Option<u64> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.state.discovered.load(Ordering::SeqCst))
    }

    async fn consume(self: Arc<Self>, mut notifications: mpsc::Receiver<LogNotification>, state: Arc<SessionState>) {
        while let Some(notification) = notifications.recv().await {
            LOG_NOTIFICATIONS_RECEIVED.inc();

            if !state.seen.lock().await.insert(notification.signature) {
                DUPLICATE_NOTIFICATIONS.inc();
                continue;
            }
            if let Some(err) = &notification.err {
                debug!(signature = %notification.signature, err = %err, "Transaction en échec ignorée.");
                continue;
            }
            if find_log_entry(&notification.logs, LP_INIT_LOG_MARKER).is_none() {
                continue;
            }

            let monitor = Arc::clone(&self);
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                monitor.handle_pool_creation(notification.signature, state).await;
            });
        }
        self.end_session(&state).await;
    }

    /// Le flux s'est fermé sans `stop()` : on libère la session pour qu'un
    /// nouveau `start()` soit accepté. Sans effet si la session a déjà changé.
    async fn end_session(&self, state: &Arc<SessionState>) {
        state.active.store(false, Ordering::SeqCst);

        let mut session = self.session.lock().await;
        let Some(current) = session.as_ref() else {
            return;
        };
        if !Arc::ptr_eq(&current.state, state) {
            return;
        }
        let subscription_id = current.subscription_id;
        *session = None;
        drop(session);

        if let Err(e) = self.ledger.logs_unsubscribe(subscription_id).await {
            debug!(subscription_id, error = %e, "Désabonnement après fin de flux en échec.");
        }
        MONITORING_ACTIVE.set(0);
        let nothing_received = state.seen.lock().await.is_empty();
        if nothing_received {
            warn!(subscription_id, "Le flux s'est terminé sans aucune notification reçue.");
        }
        error!(
            subscription_id,
            discovered = state.discovered.load(Ordering::SeqCst),
            "Le flux de notifications s'est terminé, session libérée. Un nouveau start est nécessaire."
        );
    }

    #[instrument(name = "pool_creation", skip_all, fields(signature = %signature))]
    async fn handle_pool_creation(&self, signature: Signature, state: Arc<SessionState>) {
        let descriptor = match fetch_pool_descriptor(self.ledger.as_ref(), &signature).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                DECODE_FAILURES.with_label_values(&[e.label()]).inc();
                warn!(error = %e, "Transaction d'initialisation non décodable, ignorée.");
                return;
            }
        };

        let spend_mint = self.orchestrator.spend_mint();
        if !descriptor.contains_mint(&spend_mint) {
            reject(&descriptor.id.to_string(), &RejectionReason::SpendMintNotInPool(spend_mint));
            return;
        }

        let target = descriptor.target_mint();
        if let Err(reason) = self.validator.screen(&target.mint).await {
            reject(&descriptor.id.to_string(), &reason);
            return;
        }
        if self.settings.burn_check_enabled && !self.burn_checker.is_burned(&descriptor.lp_mint).await {
            reject(&descriptor.id.to_string(), &RejectionReason::LiquidityNotBurned);
            return;
        }

        // La session a pu être arrêtée pendant le décodage et le filtrage.
        if !state.active.load(Ordering::SeqCst) {
            debug!(pool = %descriptor.id, "Session arrêtée, pool ignorée.");
            return;
        }

        let count = state.discovered.fetch_add(1, Ordering::SeqCst) + 1;
        POOLS_DISCOVERED.inc();
        info!(
            pool = %descriptor.id,
            target_mint = %target.mint,
            open_time = descriptor.open_time,
            discovered = count,
            "Nouvelle pool validée, lancement du pipeline."
        );
        self.orchestrator.launch(Arc::new(descriptor));
    }
}

fn reject(pool: &str, reason: &RejectionReason) {
    POOLS_REJECTED.with_label_values(&[reason.label()]).inc();
    info!(pool, reason = %reason, "Pool rejetée par le filtrage.");
}
