// DANS : src/monitoring/logging.rs
use anyhow::{anyhow, Result};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Filtre appliqué quand `RUST_LOG` est absent : le sniper en `info`, les
/// dépendances (clients Solana, hyper, warp) seulement à partir de `warn`.
const DEFAULT_DIRECTIVES: &str = "warn,sniper=info";

/// Logs JSON, un objet par ligne. Les spans `pipeline` et `pool_creation`
/// sont émis à leur fermeture, avec leur durée et la pool ou la signature concernée.
pub fn setup_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Initialisation du logging impossible : {}", e))
}
