//! Flight Oracle Server
//!
//! Registers a pool of simulated oracles with the flight surety contract,
//! then answers every `OracleRequest` the contract emits with one status
//! response per oracle holding the requested index.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flight_oracle_server::app_state::AppState;
use flight_oracle_server::config::OracleConfig;
use flight_oracle_server::event_listener::{self, EventListener};
use flight_oracle_server::ledger::rpc::RpcLedgerClient;
use flight_oracle_server::ledger::LedgerClient;
use flight_oracle_server::routes;
use flight_oracle_server::services::{bootstrap_service, OracleBootstrapper, OracleService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = OracleConfig::from_env().context("invalid configuration")?;
    info!(
        rpc_url = %config.rpc_url,
        contract = %config.app_contract_address,
        "starting flight oracle server"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown requested"),
                Err(err) => error!(error = %err, "failed to listen for ctrl-c"),
            }
            shutdown.cancel();
        }
    });

    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(
        config.rpc_url.clone(),
        config.app_contract_address.clone(),
        config.gas,
    ));

    let Some(pool) = bootstrap_service::resolve_pool_with_retry(
        ledger.as_ref(),
        &config.selection,
        &config.listener,
        &shutdown,
    )
    .await
    else {
        info!("shutdown before the oracle pool was resolved");
        return Ok(());
    };

    // Bootstrap completes before the listener is armed; the registry is frozen after this.
    let bootstrapper = OracleBootstrapper::new(
        Arc::clone(&ledger),
        config.registration_fee_wei,
        config.max_index,
    );
    let report = bootstrapper.bootstrap(&pool, &shutdown).await;
    if shutdown.is_cancelled() {
        info!("shutdown during oracle bootstrap");
        return Ok(());
    }
    if report.registry.is_empty() {
        warn!("no oracle registered; status requests will go unanswered");
    }
    let registry = Arc::new(report.registry);

    let service = Arc::new(OracleService::new(Arc::clone(&registry), Arc::clone(&ledger)));
    let listener = Arc::new(EventListener::new(
        Arc::clone(&ledger),
        service,
        config.listener.clone(),
    ));
    let listener_task = tokio::spawn(event_listener::supervise(listener, shutdown.clone()));

    let app = routes::app(AppState::new(registry), &config.cors_allowed_origins);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server starting on {}", addr);

    // The health endpoint is supervisory only; losing it must not stop dispatch.
    match tokio::net::TcpListener::bind(addr).await {
        Ok(tcp) => {
            let serve_shutdown = shutdown.clone();
            if let Err(err) = axum::serve(tcp, app)
                .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
                .await
            {
                error!(error = %err, "http server failed");
            }
        }
        Err(err) => error!(error = %err, %addr, "failed to bind http listener"),
    }
    shutdown.cancelled().await;

    if let Err(join_error) = listener_task.await {
        error!(error = %join_error, "event listener supervisor failed");
    }

    info!("flight oracle server stopped");
    Ok(())
}
