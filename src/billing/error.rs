//! Billing API transport errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BillingError {
    /// Whether another attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::RateLimited { .. } | BillingError::Timeout(_) => true,
            BillingError::Status { status, .. } => (500..=599).contains(status),
            BillingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Server-requested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BillingError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
