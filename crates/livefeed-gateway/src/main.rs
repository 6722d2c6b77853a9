use clap::Parser;
use livefeed_core::LivefeedConfig;
use livefeed_hub::BroadcastHub;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod http;

/// Live event feed: POST /ingest fans out to every GET /events stream.
#[derive(Debug, Parser)]
#[command(name = "livefeed-gateway", version)]
struct Cli {
    /// Config file (default: $LIVEFEED_CONFIG, then ~/.livefeed/livefeed.toml)
    #[arg(long)]
    config: Option<String>,

    /// Address to bind, overrides config
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on, overrides config and $PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "livefeed_gateway=info,livefeed_core=info,livefeed_hub=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > LIVEFEED_CONFIG env > ~/.livefeed/livefeed.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("LIVEFEED_CONFIG").ok());
    let mut config = LivefeedConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        LivefeedConfig::default()
    });
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let hub = BroadcastHub::new(config.hub.clone());
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;

    let state = Arc::new(app::AppState::new(config, hub.clone()));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("livefeed gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await?;

    info!("livefeed gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then end every event stream so graceful
/// shutdown is not held open by long-lived `/events` responses.
async fn shutdown_signal(hub: BroadcastHub) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
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

    let dropped = hub.shutdown();
    info!(dropped, "shutdown signal received, event streams closed");
}
