//! Crisiswatch -- crisis detection and alert escalation for citizen reports.
//!
//! This crate provides the core library for turning a stream of raw
//! citizen reports into prioritized incidents: outlier detection over
//! report feature vectors, distance-based spatial grouping, multi-factor
//! severity scoring, and escalation of severe incidents into alerts
//! routed to emergency contacts.

pub mod alert;
pub mod api;
pub mod config;
pub mod detect;
pub mod model;
pub mod storage;

use crate::config::Config;
use crate::detect::engine::CrisisEngine;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Start the crisiswatch daemon: API server plus the periodic batch loop.
pub async fn serve(bind: &str, config: Config) -> Result<()> {
    // 1. Initialize Storage
    info!(db = %config.db_path, "Initializing database");
    let pool = storage::open_pool(&config.db_path)?;

    // 2. Assemble the engine with its production collaborators
    let engine = Arc::new(CrisisEngine::from_config(pool.clone(), &config)?);

    // 3. Start the batch loop (background task)
    let loop_engine = engine.clone();
    let every = Duration::from_secs(config.interval_secs);
    tokio::spawn(async move {
        run_batch_loop(loop_engine, every).await;
    });

    // 4. Start API Server
    let state = api::state::AppState { pool, engine };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    info!(%addr, "Crisiswatch listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drive `process_reports` on a fixed interval. Exactly one of these
/// loops runs per daemon, which is what keeps batch runs from
/// overlapping.
async fn run_batch_loop(engine: Arc<CrisisEngine>, every: Duration) {
    info!(every_secs = every.as_secs(), "Batch loop started");
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;
        match engine.process_reports().await {
            Ok(outcome) => {
                info!(
                    fetched = outcome.fetched,
                    incidents = outcome.incidents.len(),
                    alerts = outcome.alerts.len(),
                    "Batch run complete"
                );
            }
            Err(e) => {
                error!(error = %e, "Batch run failed");
            }
        }
    }
}
