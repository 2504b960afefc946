// DANS : src/monitoring/metrics.rs

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder, register_histogram_vec,
    register_int_counter, register_int_counter_vec, register_int_gauge,
};
use warp::{Filter, Rejection, Reply};

lazy_static! {
    // --- Découverte ---
    pub static ref LOG_NOTIFICATIONS_RECEIVED: IntCounter = register_int_counter!(
        "sniper_log_notifications_received_total", "Nombre total de notifications de logs reçues"
    ).unwrap();
    pub static ref DUPLICATE_NOTIFICATIONS: IntCounter = register_int_counter!(
        "sniper_duplicate_notifications_total", "Notifications ignorées car la signature a déjà été vue"
    ).unwrap();
    pub static ref POOLS_DISCOVERED: IntCounter = register_int_counter!(
        "sniper_pools_discovered_total", "Pools validées et transmises à l'orchestrateur"
    ).unwrap();
    pub static ref DECODE_FAILURES: IntCounterVec = register_int_counter_vec!(
        "sniper_decode_failures_total",
        "Échecs de décodage de transactions d'initialisation",
        &["reason"] // Labels: "missing_quote_transfer", "rpc", etc.
    ).unwrap();
    pub static ref POOLS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "sniper_pools_rejected_total",
        "Pools écartées par le filtrage",
        &["reason"] // Labels: "freeze_authority", "lp_not_burned", etc.
    ).unwrap();
    pub static ref MONITORING_ACTIVE: IntGauge = register_int_gauge!(
        "sniper_monitoring_active", "1 si une session de surveillance est active"
    ).unwrap();

    // --- Exécution ---
    pub static ref PIPELINE_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "sniper_pipeline_outcomes_total",
        "États terminaux des pipelines achat/vente",
        &["outcome"] // Labels: "done", "failed_buying", etc.
    ).unwrap();
    pub static ref SELL_ATTEMPTS: IntCounter = register_int_counter!(
        "sniper_sell_attempts_total", "Nombre total de tentatives de vente"
    ).unwrap();
    pub static ref TRANSACTIONS_SENT: IntCounter = register_int_counter!(
        "sniper_transactions_sent_total", "Nombre de transactions diffusées"
    ).unwrap();

    // --- RPC ---
    pub static ref RPC_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "sniper_rpc_request_latency_seconds",
        "Latence des appels RPC vers le nœud Solana",
        &["method"]
    ).unwrap();
    pub static ref RPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sniper_rpc_requests_total",
        "Compteur total des requêtes RPC, segmenté par méthode et statut",
        &["method", "status"] // Labels: "get_account", "success" / "failure"
    ).unwrap();
}

/// Encode le registre global au format texte Prometheus.
pub fn render() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Échec de l'encodage des métriques.");
    }
    buffer
}

/// Route `GET /metrics`, montée par le serveur de contrôle.
pub fn route() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics")
        .and(warp::get())
        .map(|| warp::reply::with_header(render(), "content-type", "text/plain; version=0.0.4"))
}
