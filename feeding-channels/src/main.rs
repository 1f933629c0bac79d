//! Feeding Bot - Main entry point.

use anyhow::Result;
use feeding_channels::start_bot;
use feeding_common::prelude::{init_logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration, environment wins over the file
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Feeding Bot v{}", env!("CARGO_PKG_VERSION"));

    start_bot(&config).await
}
