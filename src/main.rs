mod cache;
mod config;
mod error;
mod paths;
mod sanitize;
mod server;
mod static_files;
mod storage;
mod upload;
mod util;
mod validator;

use anyhow::Result;
use crate::config::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default "info" level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new()?;
    tracing::info!("Loaded settings: {:?}", settings);

    server::run_server(settings).await
}
