use clap::Parser;
use graphchat::adapters::health_handler::HealthHandler;
use graphchat::chat::domain::ChatPort;
use graphchat::chat::ChatHandler;
use graphchat::cli::Cli;
use graphchat::config::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting graphchat on {}:{} (domain: {})", host, port, settings.chat.domain);

    let handler = ChatHandler::from_settings(&settings)?;
    let health_handler = Arc::new(HealthHandler::new(Some(handler.graph_endpoint())));
    let chat: Arc<dyn ChatPort> = Arc::new(handler);

    // Drop idle sessions in the background
    let sweeper = chat.clone();
    let sweep_every = Duration::from_secs(settings.server.session_sweep_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.purge_expired().await {
                warn!("Session sweep failed: {}", e);
            }
        }
    });

    let app = graphchat::create_app(chat, health_handler);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
