//! Reserved Instance client (Microsoft.Capacity + Microsoft.Consumption).

use serde::Deserialize;
use tracing::debug;

use super::auth::AccessToken;
use super::client::{ArmResource, BillingPeriod, CommitmentClient, ScopeProperties, arm_url};
use super::error::BillingError;
use super::http::BillingHttp;
use crate::types::{Commitment, CommitmentType, UsageRecord};

const ORDERS_PATH: &str = "/providers/Microsoft.Capacity/reservationOrders";
const ORDERS_API_VERSION: &str = "2022-11-01";
const SUMMARIES_API_VERSION: &str = "2023-05-01";

/// Reservation order listing and monthly utilization summaries.
pub struct ReservationClient {
    http: BillingHttp,
    management_url: String,
    period: BillingPeriod,
}

impl ReservationClient {
    pub fn new(http: BillingHttp, management_url: String, period: BillingPeriod) -> Self {
        Self {
            http,
            management_url,
            period,
        }
    }
}

// reservationSummaries response types
#[derive(Debug, Deserialize)]
struct SummaryItem {
    properties: Option<SummaryProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryProperties {
    #[serde(alias = "avgUtilizationPercentage")]
    utilization_percentage: Option<f64>,
    scope: Option<String>,
}

impl CommitmentClient for ReservationClient {
    async fn list_commitments(&self, token: &AccessToken) -> Result<Vec<Commitment>, BillingError> {
        let url = arm_url(&self.management_url, ORDERS_PATH, ORDERS_API_VERSION, &[])?;
        debug!(url = %url, "listing reservation orders");

        let orders: Vec<ArmResource<ScopeProperties>> =
            self.http.get_all_pages(url.as_str(), token).await?;

        Ok(orders
            .into_iter()
            .map(|order| order.into_commitment(CommitmentType::ReservedInstance))
            .collect())
    }

    async fn fetch_usage(
        &self,
        commitment: &Commitment,
        token: &AccessToken,
    ) -> Result<Vec<UsageRecord>, BillingError> {
        let filter = format!(
            "properties/usageDate ge {} AND properties/usageDate le {}",
            self.period.start.format("%Y-%m-%d"),
            self.period.end.format("%Y-%m-%d")
        );
        let path = format!(
            "{}/providers/Microsoft.Consumption/reservationSummaries",
            commitment.order_id
        );
        let url = arm_url(
            &self.management_url,
            &path,
            SUMMARIES_API_VERSION,
            &[("grain", "monthly"), ("$filter", filter.as_str())],
        )?;
        debug!(commitment = %commitment.name, url = %url, "fetching reservation summaries");

        let items: Vec<SummaryItem> = self.http.get_all_pages(url.as_str(), token).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let props = item.properties;
                UsageRecord {
                    utilization: props.as_ref().and_then(|p| p.utilization_percentage),
                    scope: props
                        .and_then(|p| p.scope)
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| commitment.scope.clone()),
                }
            })
            .collect())
    }
}
