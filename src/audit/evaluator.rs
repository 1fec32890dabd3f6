//! Underutilization policy.

use serde::{Deserialize, Serialize};

use crate::types::{Commitment, Finding, UsageRecord};

/// Commitments used below this percentage are reported.
pub const UNDERUTILIZATION_THRESHOLD: f64 = 70.0;

/// Utilization assumed when a usage record has no value.
///
/// A missing value counts as fully used, so it is never reported.
pub const DEFAULT_UTILIZATION: f64 = 100.0;

/// Threshold policy applied to every usage record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub threshold: f64,
    pub default_utilization: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            threshold: UNDERUTILIZATION_THRESHOLD,
            default_utilization: DEFAULT_UTILIZATION,
        }
    }
}

impl Policy {
    /// Finding for `usage` when it falls below the threshold.
    pub fn evaluate(&self, commitment: &Commitment, usage: &UsageRecord) -> Option<Finding> {
        let utilization = usage.utilization.unwrap_or(self.default_utilization);
        if utilization >= self.threshold {
            return None;
        }

        let scope = if usage.scope.is_empty() {
            commitment.scope.clone()
        } else {
            usage.scope.clone()
        };

        Some(Finding {
            kind: commitment.kind,
            name: commitment.name.clone(),
            utilization,
            scope,
            recommendation: commitment.kind.recommendation().to_string(),
        })
    }

    /// Findings for every record of one commitment, in record order.
    pub fn evaluate_all(&self, commitment: &Commitment, usage: &[UsageRecord]) -> Vec<Finding> {
        usage
            .iter()
            .filter_map(|record| self.evaluate(commitment, record))
            .collect()
    }
}
