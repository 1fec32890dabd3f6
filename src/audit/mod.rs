//! Utilization audit: policy evaluation, report output, and run orchestration.

mod error;
mod evaluator;
mod pipeline;
mod report;

pub use error::FailedStage;
pub use evaluator::{DEFAULT_UTILIZATION, Policy, UNDERUTILIZATION_THRESHOLD};
pub use pipeline::{Pipeline, PipelineOptions, RunState, RunSummary};
pub use report::{ReportWriter, format_utilization, read_report};
