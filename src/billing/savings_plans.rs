//! Savings Plan client (Microsoft.BillingBenefits).

use serde::Deserialize;
use tracing::debug;

use super::auth::AccessToken;
use super::client::{ArmResource, CommitmentClient, ScopeProperties, arm_url};
use super::error::BillingError;
use super::http::BillingHttp;
use crate::types::{Commitment, CommitmentType, UsageRecord};

const ORDERS_PATH: &str = "/providers/Microsoft.BillingBenefits/savingsPlanOrders";
const API_VERSION: &str = "2022-11-01";

/// Aggregation window preferred for the period utilization.
const PREFERRED_GRAIN_DAYS: f64 = 30.0;

/// Savings plan order listing and per-plan utilization aggregates.
pub struct SavingsPlanClient {
    http: BillingHttp,
    management_url: String,
}

impl SavingsPlanClient {
    pub fn new(http: BillingHttp, management_url: String) -> Self {
        Self {
            http,
            management_url,
        }
    }
}

// savingsPlans response types
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanProperties {
    #[serde(flatten)]
    scope: ScopeProperties,
    utilization: Option<PlanUtilization>,
}

#[derive(Debug, Deserialize)]
struct PlanUtilization {
    #[serde(default)]
    aggregates: Vec<UtilizationAggregate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtilizationAggregate {
    grain: Option<f64>,
    grain_unit: Option<String>,
    value: Option<f64>,
}

impl UtilizationAggregate {
    fn grain_days(&self) -> f64 {
        let grain = self.grain.unwrap_or(0.0);
        match self.grain_unit.as_deref().map(str::to_lowercase).as_deref() {
            Some("months") => grain * 30.0,
            Some("hours") => grain / 24.0,
            _ => grain,
        }
    }
}

impl PlanUtilization {
    /// Value of the 30-day aggregate, or of the longest grain reported.
    fn period_value(&self) -> Option<f64> {
        let reported = self.aggregates.iter().filter(|a| a.value.is_some());

        reported
            .clone()
            .find(|a| a.grain_days() == PREFERRED_GRAIN_DAYS)
            .or_else(|| reported.max_by(|a, b| a.grain_days().total_cmp(&b.grain_days())))
            .and_then(|a| a.value)
    }
}

impl CommitmentClient for SavingsPlanClient {
    async fn list_commitments(&self, token: &AccessToken) -> Result<Vec<Commitment>, BillingError> {
        let url = arm_url(&self.management_url, ORDERS_PATH, API_VERSION, &[])?;
        debug!(url = %url, "listing savings plan orders");

        let orders: Vec<ArmResource<ScopeProperties>> =
            self.http.get_all_pages(url.as_str(), token).await?;

        Ok(orders
            .into_iter()
            .map(|order| order.into_commitment(CommitmentType::SavingsPlan))
            .collect())
    }

    async fn fetch_usage(
        &self,
        commitment: &Commitment,
        token: &AccessToken,
    ) -> Result<Vec<UsageRecord>, BillingError> {
        let path = format!("{}/savingsPlans", commitment.order_id);
        let url = arm_url(&self.management_url, &path, API_VERSION, &[])?;
        debug!(commitment = %commitment.name, url = %url, "fetching savings plans");

        let plans: Vec<ArmResource<PlanProperties>> =
            self.http.get_all_pages(url.as_str(), token).await?;

        Ok(plans
            .into_iter()
            .map(|plan| {
                let props = plan.properties.unwrap_or_default();
                UsageRecord {
                    utilization: props.utilization.as_ref().and_then(PlanUtilization::period_value),
                    scope: props.scope.scope().unwrap_or_else(|| commitment.scope.clone()),
                }
            })
            .collect())
    }
}
