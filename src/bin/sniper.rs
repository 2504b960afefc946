#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use sniper::{
    config::Config,
    control,
    execution::{supervisor::spawn_supervisor, RaydiumSwapBuilder, SwapBuilder, SwapOrchestrator},
    filtering::{LiquidityBurnChecker, TokenValidator},
    listener::TokenMonitor,
    monitoring::logging::setup_logging,
    rpc::{LedgerClient, ResilientRpcClient, SolanaLedger},
};
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let config = Config::load().context("Configuration invalide, arrêt avant le démarrage de la surveillance")?;
    info!(payer = %config.payer.pubkey(), control_addr = %config.control_addr, "Configuration chargée.");

    // --- Composition explicite, des feuilles vers les dépendants ---
    let rpc = Arc::new(ResilientRpcClient::new(
        config.rpc.rpc_url.clone(),
        config.rpc.max_retries,
        config.rpc.retry_delay_ms,
    ));
    let ledger: Arc<dyn LedgerClient> = Arc::new(SolanaLedger::new(Arc::clone(&rpc), config.rpc.ws_url.clone()));
    let swap_builder: Arc<dyn SwapBuilder> = Arc::new(RaydiumSwapBuilder::new(Arc::clone(&rpc), Arc::clone(&config.payer)));

    let (reports_tx, reports_rx) = mpsc::unbounded_channel();
    let supervisor = spawn_supervisor(reports_rx);

    let orchestrator = Arc::new(SwapOrchestrator::new(
        Arc::clone(&ledger),
        swap_builder,
        config.trade.clone(),
        config.payer.pubkey(),
        reports_tx,
    ));
    let monitor = Arc::new(TokenMonitor::new(
        Arc::clone(&ledger),
        Arc::new(TokenValidator::new(Arc::clone(&ledger))),
        Arc::new(LiquidityBurnChecker::new(Arc::clone(&ledger))),
        orchestrator,
        config.monitor.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = control::serve(config.control_addr, Arc::clone(&monitor), async move {
        let _ = shutdown_rx.await;
    })?;
    let server = tokio::spawn(server);

    if config.auto_start {
        match monitor.start().await {
            Ok(status) => info!(status, "Démarrage automatique de la surveillance."),
            Err(e) => error!(error = %e, "Échec du démarrage automatique de la surveillance."),
        }
    }

    tokio::signal::ctrl_c().await.context("Impossible d'écouter le signal Ctrl-C")?;
    info!("Signal d'arrêt reçu.");

    let status = monitor.stop().await;
    info!(status, "Surveillance arrêtée.");
    let _ = shutdown_tx.send(());
    if let Err(e) = server.await {
        error!(error = %e, "Le serveur de contrôle s'est arrêté anormalement.");
    }
    // Les pipelines en vol ne sont pas attendus.
    supervisor.abort();

    Ok(())
}
