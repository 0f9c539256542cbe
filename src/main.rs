use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ad_normalizer::app;
use ad_normalizer::config::settings::{AppConfig, StoreBackend};
use ad_normalizer::infrastructure::adserver::client::AdServerClient;
use ad_normalizer::infrastructure::encore::client::HttpEncoreClient;
use ad_normalizer::infrastructure::osc::token::ServiceTokenProvider;
use ad_normalizer::infrastructure::redis::client::RedisService;
use ad_normalizer::state::AppState;
use ad_normalizer::store::TranscodeStore;
use ad_normalizer::store::memory::MemoryTranscodeStore;
use ad_normalizer::store::redis_store::RedisTranscodeStore;
use ad_normalizer::workers::kpi::{KpiReporter, run_kpi_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ad normalizer...");

    let config = AppConfig::new().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    let store: Arc<dyn TranscodeStore> = match config.store_backend {
        StoreBackend::Redis => {
            let url = config.redis_url.as_deref().context("REDIS_URL is not set")?;
            let redis = RedisService::new(url)
                .await
                .context("failed to connect to Redis")?;
            Arc::new(RedisTranscodeStore::new(redis))
        }
        StoreBackend::Memory => {
            info!("⚠️ Using in-memory store, state is lost on restart");
            Arc::new(MemoryTranscodeStore::new())
        }
    };

    let tokens = match &config.osc_access_token {
        Some(pat) => Some(Arc::new(ServiceTokenProvider::new(pat.clone(), &config.environment)?)),
        None => None,
    };
    let encore = Arc::new(HttpEncoreClient::new(&config, tokens)?);
    let ad_server = AdServerClient::new(config.ad_server_url.clone())?;

    let shutdown = CancellationToken::new();
    let (kpi, kpi_events) = KpiReporter::channel();
    let kpi_worker = tokio::spawn(run_kpi_worker(
        kpi_events,
        config.kpi_post_url.clone(),
        config.kpi_export_interval,
        shutdown.clone(),
    ));

    let port = config.server_port;
    let state = AppState::new(config, store, encore, ad_server, kpi);
    let app = app::create_app(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("🚀 Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    kpi_worker.await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
