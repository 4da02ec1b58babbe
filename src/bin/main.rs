use account_insight::{build_pipeline, Config};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let place_call = env::args().skip(1).any(|arg| arg == "--call");

    info!(
        account = %config.banking.account_uid,
        year = config.banking.spending_period.year,
        month = %config.banking.spending_period.month_param(),
        "Account insight run starting"
    );

    let pipeline = build_pipeline(&config)?;

    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Failed to fetch account info: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    println!("\n=== ACCOUNT SUMMARY ===\n");
    println!("{}", summary.text);

    if place_call {
        if let Err(e) = pipeline.notify().await {
            error!("Summary call failed: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
        println!("\nCall placed.");
    }

    Ok(())
}
