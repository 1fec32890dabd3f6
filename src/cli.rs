//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::{ConfigCmd, InspectCmd, RunCmd};
use crate::config::SettingsArgs;

#[derive(Parser)]
#[command(name = "ri-sp-audit")]
#[command(about = "Audit Reserved Instance and Savings Plan utilization")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Audit commitments and write the report
    Run(RunCmd),

    /// Print the findings of an existing report
    Inspect(InspectCmd),

    /// Show configuration
    Config(ConfigCmd),
}

impl Cli {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match &self.command {
            None => RunCmd::default().run(&self.settings).await,
            Some(Command::Run(cmd)) => cmd.run(&self.settings).await,
            Some(Command::Inspect(cmd)) => cmd.run().await,
            Some(Command::Config(cmd)) => cmd.run(&self.settings).await,
        }
    }
}
