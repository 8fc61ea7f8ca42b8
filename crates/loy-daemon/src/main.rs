//! loy-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, connects storage,
//! spawns the reconciliation driver, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; shared state types live
//! in `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use loy_accrual::HttpAccrualClient;
use loy_daemon::{config::Config, routes, state::AppState};
use loy_db::PgRepository;
use loy_pipeline::Governor;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience). Silent when the file does not
    // exist — production injects env vars directly.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = Config::parse();

    let pool = loy_db::connect(&cfg.database_uri).await?;
    loy_db::migrate(&pool).await?;

    let repo = Arc::new(PgRepository::new(pool));
    let accrual = Arc::new(HttpAccrualClient::new(
        cfg.accrual_address.clone(),
        cfg.default_backoff(),
    ));

    // Process-lifetime cancellation: flipping the watch value stops the
    // driver from scheduling new cycles; the in-flight cycle drains.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let driver = tokio::spawn(loy_pipeline::run(
        repo.clone() as Arc<dyn loy_db::Repository>,
        accrual as Arc<dyn loy_accrual::AccrualApi>,
        Arc::new(Governor::new()),
        cfg.reconcile(),
        shutdown_rx,
    ));

    let shared = Arc::new(AppState::new(repo));
    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    info!("loy-daemon listening on http://{}", cfg.run_address);

    let listener = tokio::net::TcpListener::bind(&cfg.run_address)
        .await
        .with_context(|| format!("failed to bind {}", cfg.run_address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("server crashed")?;

    // Server is down; stop the reconciliation driver and let it drain.
    let _ = shutdown_tx.send(true);
    driver.await.context("reconciliation driver panicked")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
