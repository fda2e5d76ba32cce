//! Toursight — Binary Entrypoint
//! Boots the Axum HTTP server: config, catalog and risk artifacts, vision
//! collaborators, routes, metrics.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toursight::achievements::{DynVisitTracker, InMemoryVisits};
use toursight::api::{self, AppState};
use toursight::catalog::SiteCatalog;
use toursight::config::{EngineConfig, DEFAULT_BIND_ADDR, ENV_BIND_ADDR};
use toursight::metrics::Metrics;
use toursight::risk::RiskEngine;
use toursight::vision;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("toursight=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(EngineConfig::load());

    // A missing catalog degrades to an empty one: every query then answers
    // "nothing nearby" instead of the service refusing to boot.
    let catalog = match SiteCatalog::load_from_file(&config.catalog_path) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, path = %config.catalog_path, "site catalog unavailable, starting empty");
            Arc::new(SiteCatalog::default())
        }
    };
    info!(sites = catalog.len(), "site catalog loaded");

    let risk = Arc::new(RiskEngine::load(
        &config.centroids_path,
        &config.risk_table_path,
    ));
    if !risk.available() {
        error!("risk scoring degraded: artifacts missing or unreadable");
    }

    let (oracle, detector) = vision::build_from_config(&config.vision, &config.media_dir);
    let visits: DynVisitTracker = Arc::new(InMemoryVisits::new());

    let metrics = Metrics::init(catalog.len(), risk.available());

    let state = AppState {
        config,
        catalog,
        oracle,
        detector,
        risk,
        visits,
    };
    let app = api::router(state).merge(metrics.router());

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "toursight listening");
    axum::serve(listener, app).await?;
    Ok(())
}
