use account_insight::{api::start_server, build_pipeline, Config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        eprintln!("⚠️  {}", e);
        eprintln!("📌 See .env.example for setup instructions");
        e
    })?;

    info!("🚀 Account Insight - API Server");
    info!("📍 Port: {}", config.api_port);

    let pipeline = Arc::new(build_pipeline(&config)?);

    info!("✅ Pipeline initialized");
    info!("📡 Starting API server...");

    start_server(pipeline, config.api_port).await?;

    Ok(())
}
