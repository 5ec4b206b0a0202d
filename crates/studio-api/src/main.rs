use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use studio_contracts::models::{ModelRegistry, StepModels};
use studio_engine::{BlockingPool, RoomPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_api::config::ServerConfig;
use studio_api::router::build_app_router;
use studio_api::state::AppState;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "studio_api=debug,studio_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("invalid server configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        prefix = %config.api_prefix,
        provider = %config.provider,
        "Loaded server configuration"
    );

    let models = match config.provider {
        studio_engine::ProviderKind::Gemini => StepModels::from_env(),
        studio_engine::ProviderKind::Dryrun => StepModels::dryrun(),
    };
    for warning in models.check(&ModelRegistry::default()) {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        step1 = %models.step1,
        step2 = %models.step2,
        step3 = %models.step3,
        "Step models resolved"
    );

    // The blocking HTTP client must be created and dropped outside the
    // runtime; this handle outlives it.
    let client = studio_engine::client_from_env(config.provider)
        .context("failed to build generative client")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let pipeline = RoomPipeline::new(
        Arc::clone(&client),
        models,
        BlockingPool::new(config.max_concurrent_calls),
    );
    let result = runtime.block_on(serve(AppState::new(pipeline, config)));

    drop(runtime);
    drop(client);
    result
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let host: std::net::IpAddr = state
        .config
        .host
        .parse()
        .with_context(|| format!("invalid HOST address '{}'", state.config.host))?;
    let addr = SocketAddr::new(host, state.config.port);
    let app = build_app_router(state);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
