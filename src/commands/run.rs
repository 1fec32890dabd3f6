//! Run command - audit commitment utilization and write the report.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use crate::audit::{Pipeline, ReportWriter, RunState, RunSummary};
use crate::billing::{BillingClients, BillingHttp, BillingPeriod, ClientCredentials};
use crate::config::{AuditConfig, SettingsArgs};
use crate::types::CommitmentType;

#[derive(Args, Debug, Default)]
pub struct RunCmd {
    /// Commitment types to audit (default: all)
    #[arg(long = "type", short = 't', value_enum)]
    pub kinds: Vec<CommitmentType>,

    /// List every skipped commitment and failed listing
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl RunCmd {
    pub async fn run(&self, settings: &SettingsArgs) -> Result<()> {
        let config = AuditConfig::resolve(settings)?;
        let credentials = config.credentials()?;

        let http = BillingHttp::new(config.request_timeout, config.retry.clone())
            .context("Failed to build HTTP client")?;
        let now = Utc::now();

        let tokens = ClientCredentials::new(
            http.clone(),
            &config.authority_url,
            &config.management_url,
            &credentials,
        );
        let source = BillingClients::new(
            http,
            &config.management_url,
            BillingPeriod::containing(now.date_naive()),
        );
        let writer = ReportWriter::new(config.output_dir.clone());

        let mut pipeline =
            Pipeline::new(tokens, source, writer, config.pipeline_options(&self.kinds));
        let outcome = pipeline.run(now).await;
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                let stage = match pipeline.state() {
                    RunState::Failed(stage) => stage.to_string(),
                    _ => "audit".to_string(),
                };
                return Err(e).with_context(|| format!("Audit run failed during {}", stage));
            }
        };

        print_summary(&summary, self.verbose);

        Ok(())
    }
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    println!("Report: {}", summary.report_path.display());
    println!(
        "Generated: {}",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Results:");
    println!("  {} commitments evaluated", summary.commitments_evaluated);
    println!("  {} underutilized", summary.findings);
    if summary.skipped_commitments > 0 {
        println!("  {} skipped (usage fetch failed)", summary.skipped_commitments);
    }
    for kind in &summary.failed_types {
        println!("  {} inventory unavailable", kind);
    }
    if summary.defaulted_records > 0 {
        println!(
            "  {} usage records without utilization (counted as fully used)",
            summary.defaulted_records
        );
    }
    if summary.timed_out {
        println!("  deadline reached; report holds findings collected so far");
    }
    if summary.unevaluated_commitments > 0 {
        println!(
            "  {} not evaluated before the deadline",
            summary.unevaluated_commitments
        );
    }
    for kind in &summary.unreached_types {
        println!("  {} not reached before the deadline", kind);
    }

    if verbose && summary.partial_failures() > 0 {
        println!();
        println!("Partial failures ({}):", summary.partial_failures());
        for diagnostic in &summary.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}
