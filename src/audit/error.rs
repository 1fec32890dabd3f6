use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::billing::BillingError;
use crate::types::CommitmentType;

/// Failures of an audit run, split by the stage that produced them.
///
/// `Authentication` and `ReportWrite` end the run; inventory and usage
/// failures are recorded and the run carries on.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] BillingError),

    #[error("failed to list {kind} commitments: {source}")]
    InventoryFetch {
        kind: CommitmentType,
        #[source]
        source: BillingError,
    },

    #[error("failed to fetch usage for {commitment}: {source}")]
    UsageFetch {
        commitment: String,
        #[source]
        source: BillingError,
    },

    #[error("failed to write report {}: {source}", .path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: ReportError,
    },
}

impl AuditError {
    /// The stage this error ends the run in, or `None` for recoverable errors.
    pub fn failed_stage(&self) -> Option<FailedStage> {
        match self {
            AuditError::Authentication(_) => Some(FailedStage::Authentication),
            AuditError::ReportWrite { .. } => Some(FailedStage::ReportWrite),
            AuditError::InventoryFetch { .. } | AuditError::UsageFetch { .. } => None,
        }
    }
}

/// Stage whose failure ended a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Authentication,
    ReportWrite,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStage::Authentication => write!(f, "authentication"),
            FailedStage::ReportWrite => write!(f, "report write"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid report row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}
