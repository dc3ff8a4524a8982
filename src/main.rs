use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod api;
mod config;
mod db;
mod errors;
mod odds;

use api::AppState;
use config::Config;
use db::seed::SeedFile;
use db::Database;
use odds::{OddsBatch, OddsEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    if let Some(path) = &config.seed_file {
        let seed = SeedFile::load(path)?;
        let rows = db.import_seed(&seed)?;
        info!("Imported {} rows from {}", rows, path.display());
    }

    let engine = Arc::new(OddsEngine::with_noise(
        config.noise_half_width,
        config.noise_seed,
    )?);
    if engine.noise_half_width() > 0.0 {
        info!(
            "Uncertainty band ±{:.3}{}",
            engine.noise_half_width(),
            if config.noise_seed.is_some() { " (seeded)" } else { "" }
        );
    } else {
        warn!("Uncertainty noise disabled – odds are fully deterministic");
    }

    let batch = Arc::new(OddsBatch::new(
        Arc::new(db.clone()),
        engine.clone(),
        config.max_batch_size,
    ));

    // Periodic recompute of scheduled matches
    if config.refresh_interval_secs > 0 {
        let refresh_batch = batch.clone();
        let every = Duration::from_secs(config.refresh_interval_secs);
        info!("Scheduled-match refresh every {:?}", every);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match refresh_batch.refresh_scheduled().await {
                    Ok(outcomes) => {
                        let failed: Vec<i64> = outcomes
                            .iter()
                            .filter(|o| !o.is_success())
                            .map(|o| o.match_id())
                            .collect();
                        info!(
                            "Refreshed odds for {} scheduled matches ({} failed)",
                            outcomes.len(),
                            failed.len()
                        );
                        if !failed.is_empty() {
                            warn!("Matches without fresh odds: {:?}", failed);
                        }
                    }
                    Err(e) => error!("Scheduled odds refresh failed: {:#}", e),
                }
            }
        });
    }

    let state = AppState {
        db,
        engine,
        batch: batch.clone(),
    };
    let app = api::router(state);
    let addr: SocketAddr = config.api_addr.parse()?;
    info!(
        "Odds API listening on http://{} (max {} matches per request)",
        addr,
        batch.max_batch_size()
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
