//! # certwatch
//!
//! Watches certificates in Redis and mirrors them to local files.
//!
//! ## Usage
//!
//! ```bash
//! certwatch --redisurl redis://localhost:6379 --cmd 'nginx -s reload' example.com
//! ```
//!
//! Exits with 1 on invalid configuration or startup failure, 0 on SIGINT/SIGTERM.

use anyhow::Result;
use certwatch::config::Cli;
use certwatch::runtime::initialization::{initialize, join_server};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let init = initialize(&cli).await?;

    init.supervisor.run(init.cancel.clone()).await;

    if let Some(server) = init.server {
        join_server(server).await;
    }

    info!("certwatch stopped");
    Ok(())
}
