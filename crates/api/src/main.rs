//! Credit Scoring Service - Main Entry Point

use api::config::ServiceConfig;
use api::{init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Credit Scoring Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Feature table: {}, scaler: {}, model: {} ({})",
        config.data.table_path,
        config.model.scaler_path,
        config.model.model_path,
        config.model.kind.as_str()
    );

    run_server(config).await?;

    Ok(())
}
