//! Inspect command - print an existing report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::audit::{format_utilization, read_report};
use crate::types::CommitmentType;

#[derive(Args, Debug)]
pub struct InspectCmd {
    /// Report file to read
    pub path: PathBuf,
}

impl InspectCmd {
    pub async fn run(&self) -> Result<()> {
        let findings = read_report(&self.path)
            .with_context(|| format!("Failed to read report {}", self.path.display()))?;

        if findings.is_empty() {
            println!("No underutilized commitments.");
            return Ok(());
        }

        println!(
            "{:<18} {:<32} {:>8}  {}",
            "TYPE", "NAME", "UTIL %", "SCOPE"
        );
        for finding in &findings {
            println!(
                "{:<18} {:<32} {:>8}  {}",
                finding.kind.label(),
                finding.name,
                format_utilization(finding.utilization),
                finding.scope
            );
        }

        println!();
        for kind in CommitmentType::ALL {
            let count = findings.iter().filter(|f| f.kind == kind).count();
            if count > 0 {
                println!("  {} {}", count, kind);
            }
        }

        Ok(())
    }
}
