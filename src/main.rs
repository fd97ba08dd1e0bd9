use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use luckydraw_lib::config;
use luckydraw_lib::database::SqliteStore;
use luckydraw_lib::demo;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Opening lucky draw database at {}", config.database_url);
    let store = Arc::new(SqliteStore::open(&config.database_url)?);

    demo::run(Arc::clone(&store), config.draw_policy())
        .await
        .inspect_err(|e| {
            tracing::error!("demonstration failed: {}", e);
        })?;

    Ok(())
}
