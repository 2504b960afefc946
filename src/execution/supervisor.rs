// DANS : src/execution/supervisor.rs

use crate::execution::orchestrator::PipelineRun;
use crate::monitoring::metrics::PIPELINE_OUTCOMES;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info};

/// Reçoit les pipelines terminés, journalise leur état final et met à jour les métriques.
pub fn spawn_supervisor(mut reports: mpsc::UnboundedReceiver<PipelineRun>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(run) = reports.recv().await {
            record_outcome(&run);
        }
        info!("[Superviseur] Canal des résultats fermé, arrêt.");
    })
}

pub fn record_outcome(run: &PipelineRun) {
    if !run.stage.is_terminal() {
        error!(pool = %run.descriptor.id, stage = %run.stage, "Pipeline reçu dans un état non terminal.");
        return;
    }
    PIPELINE_OUTCOMES.with_label_values(&[run.outcome_label()]).inc();

    match &run.error {
        None => info!(
            pool = %run.descriptor.id,
            buy = ?run.buy_signature,
            sell = ?run.sell_signature,
            received = ?run.received_amount,
            sell_attempts = run.sell_attempts,
            "Pipeline terminé avec succès."
        ),
        Some(e) => error!(
            pool = %run.descriptor.id,
            failed_during = ?run.failed_during,
            sell_attempts = run.sell_attempts,
            error = %e,
            "Pipeline terminé en échec."
        ),
    }
}
