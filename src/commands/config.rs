//! Config command - show resolved configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{AuditConfig, FileConfig, SettingsArgs};

#[derive(Args, Debug)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub command: ConfigSubCmd,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubCmd {
    /// Show the effective configuration
    Show,

    /// Print the default settings file path
    Path,
}

impl ConfigCmd {
    pub async fn run(&self, settings: &SettingsArgs) -> Result<()> {
        match &self.command {
            ConfigSubCmd::Show => {
                let config = AuditConfig::resolve(settings)?;
                let source = match &settings.config {
                    Some(path) => path.display().to_string(),
                    None => FileConfig::config_path()?.display().to_string(),
                };

                println!("Config: {}", source);
                println!();
                println!("tenant_id:       {}", config.tenant_id.as_deref().unwrap_or("(not set)"));
                println!("client_id:       {}", config.client_id.as_deref().unwrap_or("(not set)"));
                println!(
                    "client_secret:   {}",
                    if config.client_secret.is_some() {
                        "(set)"
                    } else {
                        "(not set)"
                    }
                );
                println!("authority_url:   {}", config.authority_url);
                println!("management_url:  {}", config.management_url);
                println!("output_dir:      {}", config.output_dir.display());
                println!("threshold:       {}", config.policy.threshold);
                println!("default_util:    {}", config.policy.default_utilization);
                println!("concurrency:     {}", config.concurrency);
                println!("request_timeout: {}s", config.request_timeout.as_secs());
                println!("max_retries:     {}", config.retry.max_retries);
                match config.deadline {
                    Some(deadline) => println!("deadline:        {}s", deadline.as_secs()),
                    None => println!("deadline:        (none)"),
                }
            }
            ConfigSubCmd::Path => {
                println!("{}", FileConfig::config_path()?.display());
            }
        }
        Ok(())
    }
}
