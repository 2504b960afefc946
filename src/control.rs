// DANS : src/control.rs

//! Surface de contrôle HTTP : démarrage et arrêt de la surveillance, métriques.

use crate::listener::{MonitorError, TokenMonitor};
use crate::monitoring::metrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};
use tracing::{error, info};
use warp::{http::StatusCode, Filter, Rejection, Reply};

#[derive(Debug, Serialize)]
struct StatusBody {
    status: String,
}

fn status_reply(status: String, code: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&StatusBody { status }), code)
}

fn with_monitor(monitor: Arc<TokenMonitor>) -> impl Filter<Extract = (Arc<TokenMonitor>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&monitor))
}

async fn handle_start(monitor: Arc<TokenMonitor>) -> Result<impl Reply, Infallible> {
    let reply = match monitor.start().await {
        Ok(status) => status_reply(status, StatusCode::ACCEPTED),
        Err(e @ MonitorError::AlreadyRunning) => status_reply(e.to_string(), StatusCode::CONFLICT),
        Err(e) => {
            error!(error = %e, "Impossible de démarrer la surveillance.");
            status_reply(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(reply)
}

async fn handle_stop(monitor: Arc<TokenMonitor>) -> Result<impl Reply, Infallible> {
    Ok(status_reply(monitor.stop().await, StatusCode::ACCEPTED))
}

pub fn routes(monitor: Arc<TokenMonitor>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let start = warp::path!("api" / "monitor" / "start")
        .and(warp::post())
        .and(with_monitor(Arc::clone(&monitor)))
        .and_then(handle_start);
    let stop = warp::path!("api" / "monitor" / "stop")
        .and(warp::post())
        .and(with_monitor(monitor))
        .and_then(handle_stop);

    start.or(stop).or(metrics::route())
}

/// Lie la surface de contrôle à `addr`. Le serveur renvoyé tourne jusqu'à ce
/// que `shutdown` se résolve. Une adresse déjà prise est une erreur, pas une panique.
pub fn serve(
    addr: SocketAddr,
    monitor: Arc<TokenMonitor>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<impl Future<Output = ()>> {
    let (bound, server) = warp::serve(routes(monitor))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("Impossible d'exposer le serveur de contrôle sur {}", addr))?;
    info!(addr = %bound, "[Contrôle] Serveur exposé (api/monitor/start, api/monitor/stop, metrics).");
    Ok(server)
}
