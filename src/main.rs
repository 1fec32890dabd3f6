//! ri-sp-audit - report underutilized Reserved Instances and Savings Plans.

mod audit;
mod billing;
mod cli;
mod commands;
mod config;
mod types;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Controlled by RUST_LOG; logs go to stderr so stdout stays a clean summary
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.execute().await
}
