//! Notegate Server - HTTP gateway in front of the language-model backends

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use notegate_core::config::{FileSettingsProvider, SettingsProvider};
use notegate_core::logging::SharedLogger;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notegate_server::{create_router, AppState, TracingLogger};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Parser)]
#[command(
    name = "notegate-server",
    about = "HTTP gateway for notegate chat, completion and embeddings",
    version = env!("CARGO_PKG_VERSION")
)]
struct ServerArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Settings file (default: ~/.config/notegate/settings.yaml)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Time budget per streamed chat, overriding the settings file
    #[arg(long)]
    stream_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BindConfig {
    host: String,
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "notegate_server=info,notegate_core=info,tower_http=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Notegate Server");

    let settings = match &args.settings {
        Some(path) => FileSettingsProvider::new(path),
        None => FileSettingsProvider::user(),
    };
    info!("Settings file: {:?}", settings.path());
    if !settings.exists() {
        warn!("Settings file not found, using defaults and environment credentials");
    }
    let initial = settings.get_settings().await?;
    info!("Default provider: {}", initial.provider);

    let logger: SharedLogger = Arc::new(TracingLogger);
    let mut state = AppState::new(Arc::new(settings), logger);
    if let Some(secs) = args.stream_timeout_secs.filter(|secs| *secs > 0) {
        state = state.with_stream_timeout(Duration::from_secs(secs));
    }

    let app = create_router(state);

    let bind = resolve_bind_config(&args);
    let addr = format!("{}:{}", bind.host, bind.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn resolve_bind_config(args: &ServerArgs) -> BindConfig {
    BindConfig {
        host: args.host.clone().unwrap_or_else(host_from_env_or_default),
        port: args.port.unwrap_or_else(port_from_env_or_default),
    }
}

fn host_from_env_or_default() -> String {
    match std::env::var("NOTEGATE_HOST") {
        Ok(raw) => {
            let host = raw.trim();
            if host.is_empty() {
                warn!("Empty NOTEGATE_HOST, falling back to {}", DEFAULT_HOST);
                DEFAULT_HOST.to_string()
            } else {
                host.to_string()
            }
        }
        Err(_) => DEFAULT_HOST.to_string(),
    }
}

fn port_from_env_or_default() -> u16 {
    match std::env::var("NOTEGATE_PORT") {
        Ok(raw) => match raw.trim().parse::<u16>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid NOTEGATE_PORT='{}', falling back to {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }
        },
        Err(_) => DEFAULT_PORT,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
