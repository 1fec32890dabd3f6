//! Billing API clients for Reserved Instances and Savings Plans.
//!
//! Provides the credential exchange, the retrying HTTP transport, and one
//! [`CommitmentClient`] per commitment type behind a single dispatcher.
//!
//! # Example
//!
//! ```ignore
//! use crate::billing::{BillingClients, BillingSource};
//! use crate::types::CommitmentType;
//!
//! let commitments = clients.list_commitments(CommitmentType::SavingsPlan, &token).await?;
//! let usage = clients.fetch_usage(&commitments[0], &token).await?;
//! ```

mod auth;
mod backoff;
mod client;
mod error;
mod http;
mod reservations;
mod savings_plans;

pub use auth::{AccessToken, ClientCredentials, Credentials, TokenProvider};
pub use backoff::RetryPolicy;
pub use client::{BillingPeriod, CommitmentClient};
pub use error::BillingError;
pub use http::BillingHttp;

use reservations::ReservationClient;
use savings_plans::SavingsPlanClient;

use std::future::Future;

use crate::types::{Commitment, CommitmentType, UsageRecord};

/// Inventory and usage source the audit pipeline runs against.
pub trait BillingSource: Send + Sync {
    fn list_commitments(
        &self,
        kind: CommitmentType,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Commitment>, BillingError>> + Send;

    fn fetch_usage(
        &self,
        commitment: &Commitment,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<UsageRecord>, BillingError>> + Send;
}

/// Unified billing client that dispatches to the per-type implementation.
pub struct BillingClients {
    reservations: ReservationClient,
    savings_plans: SavingsPlanClient,
}

impl BillingClients {
    /// Create clients for every commitment type sharing one transport.
    pub fn new(http: BillingHttp, management_url: &str, period: BillingPeriod) -> Self {
        Self {
            reservations: ReservationClient::new(http.clone(), management_url.to_string(), period),
            savings_plans: SavingsPlanClient::new(http, management_url.to_string()),
        }
    }
}

impl BillingSource for BillingClients {
    async fn list_commitments(
        &self,
        kind: CommitmentType,
        token: &AccessToken,
    ) -> Result<Vec<Commitment>, BillingError> {
        match kind {
            CommitmentType::ReservedInstance => self.reservations.list_commitments(token).await,
            CommitmentType::SavingsPlan => self.savings_plans.list_commitments(token).await,
        }
    }

    async fn fetch_usage(
        &self,
        commitment: &Commitment,
        token: &AccessToken,
    ) -> Result<Vec<UsageRecord>, BillingError> {
        match commitment.kind {
            CommitmentType::ReservedInstance => {
                self.reservations.fetch_usage(commitment, token).await
            }
            CommitmentType::SavingsPlan => self.savings_plans.fetch_usage(commitment, token).await,
        }
    }
}
