mod config;
mod devops;
mod error;
mod model;
mod ops;
mod server;
#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use devops::{DevOps, RestClient};
use server::{Dispatcher, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config
    let config = config::load_config()?;

    // stdout carries protocol frames, so logs go to stderr
    let default_level = config.log_level.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(org = %config.org_url, project = ?config.default_project, "starting");

    let client: Arc<dyn DevOps> = Arc::new(RestClient::new(&config)?);
    let dispatcher = Dispatcher::new(client, config.default_project.clone());

    McpServer::new(dispatcher).run().await
}
