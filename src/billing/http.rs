//! Shared HTTP transport for the identity and billing endpoints.
//!
//! Every request goes through [`BillingHttp::execute`], which applies the
//! per-request timeout configured on the client and the bounded
//! [`RetryPolicy`]. Rate-limit responses (429) surface their `Retry-After`
//! header so the retry loop can honor it.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::auth::AccessToken;
use super::backoff::RetryPolicy;
use super::error::BillingError;

const USER_AGENT: &str = concat!("ri-sp-audit/", env!("CARGO_PKG_VERSION"));

/// Upper bound on followed `nextLink`s for one listing.
const MAX_PAGES: usize = 1000;

/// Longest response body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// ARM list envelope: `{ "value": [...], "nextLink": "..." }`.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// HTTP client with timeout and retry applied to every call.
#[derive(Debug, Clone)]
pub struct BillingHttp {
    client: Client,
    retry: RetryPolicy,
}

impl BillingHttp {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, BillingError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, retry })
    }

    /// GET a JSON document with bearer auth.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> Result<T, BillingError> {
        self.execute(url, || {
            self.client
                .get(url)
                .bearer_auth(token.secret().expose_secret())
        })
        .await
    }

    /// GET every page of an ARM listing, following `nextLink` until absent.
    ///
    /// Items are returned in API order.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> Result<Vec<T>, BillingError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            let page: Page<T> = self.get_json(&page_url, token).await?;
            pages += 1;
            debug!(url = %page_url, items = page.value.len(), page = pages, "fetched page");
            items.extend(page.value);

            match page.next_link {
                Some(link) if !link.is_empty() && link != page_url => {
                    if pages >= MAX_PAGES {
                        return Err(BillingError::InvalidResponse(format!(
                            "listing exceeded {} pages: {}",
                            MAX_PAGES, url
                        )));
                    }
                    next = Some(link);
                }
                _ => {}
            }
        }

        Ok(items)
    }

    /// POST a form-encoded body without auth (identity endpoint).
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, BillingError> {
        self.execute(url, || self.client.post(url).form(form)).await
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// The request is rebuilt for every attempt.
    async fn execute<T, F>(&self, url: &str, build: F) -> Result<T, BillingError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        with_retry(&self.retry, url, || {
            let request = build();
            async move {
                let response = send(request, url).await?;
                let body = response.text().await?;
                Ok::<T, BillingError>(serde_json::from_str(&body)?)
            }
        })
        .await
    }
}

/// Run `attempt` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut attempt: F,
) -> Result<T, BillingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BillingError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retries < policy.max_retries => {
                retries += 1;
                let delay = policy.delay_for(retries, e.retry_after());
                warn!(
                    target_url = what,
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response, BillingError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            BillingError::Timeout(url.to_string())
        } else {
            BillingError::Http(e)
        }
    })?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BillingError::RateLimited {
            retry_after: parse_retry_after(response.headers()),
        });
    }

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(BillingError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }

    Ok(response)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
