use std::sync::Arc;

use itech_assistant::config::{self, AppConfig};
use itech_assistant::{web, ModelClientFactory};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before the subscriber, so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    config::report_dotenv(&dotenv);

    let config = AppConfig::from_env()?;
    let factory = Arc::new(ModelClientFactory::from_env());

    web::serve(&config, factory).await?;
    Ok(())
}
