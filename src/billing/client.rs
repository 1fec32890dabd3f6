//! Commitment client trait and shared ARM response types.

use std::future::Future;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use url::Url;

use super::auth::AccessToken;
use super::error::BillingError;
use crate::types::{Commitment, CommitmentType, UsageRecord};

/// Scope reported when a resource carries no scope fields at all.
pub const SHARED_SCOPE: &str = "Shared";

/// Calendar month containing the run date, up to and including that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    pub fn containing(as_of: NaiveDate) -> Self {
        Self {
            start: as_of.with_day(1).unwrap_or(as_of),
            end: as_of,
        }
    }
}

/// Trait for commitment clients.
///
/// Each commitment type (reservations, savings plans) implements this
/// trait against its own endpoints and response shapes.
pub trait CommitmentClient: Send + Sync {
    /// List every commitment of this type, following pagination.
    fn list_commitments(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Commitment>, BillingError>> + Send;

    /// Utilization records for one commitment in the current billing period.
    ///
    /// An empty list is a valid answer.
    fn fetch_usage(
        &self,
        commitment: &Commitment,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<UsageRecord>, BillingError>> + Send;
}

/// Build `{base}{path}?api-version={version}` plus extra query pairs.
pub(super) fn arm_url(
    base: &str,
    path: &str,
    api_version: &str,
    query: &[(&str, &str)],
) -> Result<Url, BillingError> {
    let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("api-version", api_version);
    }
    Ok(url)
}

// ARM response types shared by both commitment types
#[derive(Debug, Deserialize)]
pub(super) struct ArmResource<P> {
    pub id: String,
    pub name: Option<String>,
    pub properties: Option<P>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScopeProperties {
    pub display_name: Option<String>,
    pub applied_scope_type: Option<String>,
    pub applied_scopes: Option<Vec<String>>,
    pub applied_scope_properties: Option<AppliedScopeProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AppliedScopeProperties {
    pub display_name: Option<String>,
}

impl ScopeProperties {
    /// Most specific scope available: explicit scope, scope display name, scope type.
    pub fn scope(&self) -> Option<String> {
        let explicit = self
            .applied_scopes
            .as_ref()
            .and_then(|scopes| scopes.first())
            .filter(|s| !s.is_empty());
        let named = self
            .applied_scope_properties
            .as_ref()
            .and_then(|p| p.display_name.as_ref())
            .filter(|s| !s.is_empty());
        let typed = self.applied_scope_type.as_ref().filter(|s| !s.is_empty());

        explicit.or(named).or(typed).cloned()
    }
}

impl ArmResource<ScopeProperties> {
    /// Normalize an order resource into a [`Commitment`].
    pub fn into_commitment(self, kind: CommitmentType) -> Commitment {
        let props = self.properties.unwrap_or_default();
        let scope = props.scope().unwrap_or_else(|| SHARED_SCOPE.to_string());
        let name = props
            .display_name
            .filter(|s| !s.is_empty())
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.id.clone());

        Commitment {
            order_id: self.id.clone(),
            id: self.id,
            name,
            kind,
            scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_billing_period() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        let period = BillingPeriod::containing(as_of);
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(period.end, as_of);
    }

    #[test]
    fn test_arm_url() {
        let url = arm_url(
            "https://management.azure.com/",
            "/providers/Microsoft.Capacity/reservationOrders",
            "2022-11-01",
            &[("grain", "monthly")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/providers/Microsoft.Capacity/reservationOrders?grain=monthly&api-version=2022-11-01"
        );
    }

    #[test]
    fn test_scope_precedence() {
        let explicit: ScopeProperties = serde_json::from_value(json!({
            "appliedScopeType": "Single",
            "appliedScopes": ["/subscriptions/sub-A"],
            "appliedScopeProperties": { "displayName": "Sub A" }
        }))
        .unwrap();
        let named: ScopeProperties = serde_json::from_value(json!({
            "appliedScopeType": "Single",
            "appliedScopes": null,
            "appliedScopeProperties": { "displayName": "Sub A" }
        }))
        .unwrap();
        let typed: ScopeProperties =
            serde_json::from_value(json!({ "appliedScopeType": "Shared" })).unwrap();

        assert_eq!(explicit.scope().as_deref(), Some("/subscriptions/sub-A"));
        assert_eq!(named.scope().as_deref(), Some("Sub A"));
        assert_eq!(typed.scope().as_deref(), Some("Shared"));
        assert_eq!(ScopeProperties::default().scope(), None);
    }

    #[test]
    fn test_into_commitment_falls_back_to_resource_name() {
        let resource: ArmResource<ScopeProperties> = serde_json::from_value(json!({
            "id": "/providers/Microsoft.Capacity/reservationOrders/abc",
            "name": "abc"
        }))
        .unwrap();

        let commitment = resource.into_commitment(CommitmentType::ReservedInstance);
        assert_eq!(commitment.name, "abc");
        assert_eq!(commitment.scope, SHARED_SCOPE);
        assert_eq!(commitment.order_id, commitment.id);
    }
}
