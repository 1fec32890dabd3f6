//! Client-credentials token acquisition.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::error::BillingError;
use super::http::BillingHttp;

/// Lifetime assumed when the identity endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens are considered expired this long before their stated expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Short-lived bearer token for the management API.
#[derive(Debug)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: SecretString::from(secret),
            expires_at,
        }
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

/// Anything that can hand the pipeline a bearer token.
pub trait TokenProvider: Send + Sync {
    fn acquire_token(&self) -> impl Future<Output = Result<AccessToken, BillingError>> + Send;
}

/// Tenant/application credentials for the OAuth2 client-credentials grant.
#[derive(Debug)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// OAuth2 client-credentials exchange against the identity endpoint.
pub struct ClientCredentials {
    http: BillingHttp,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    /// Seconds; some endpoints send this as a string.
    expires_in: Option<Value>,
}

impl TokenResponse {
    fn lifetime_secs(&self) -> i64 {
        match &self.expires_in {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            Some(Value::String(s)) => s.parse().unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            _ => DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }
}

impl ClientCredentials {
    pub fn new(
        http: BillingHttp,
        authority_url: &str,
        management_url: &str,
        credentials: &Credentials,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority_url.trim_end_matches('/'),
                credentials.tenant_id
            ),
            client_id: credentials.client_id.clone(),
            client_secret: SecretString::from(credentials.client_secret.expose_secret().to_owned()),
            scope: format!("{}/.default", management_url.trim_end_matches('/')),
        }
    }
}

impl TokenProvider for ClientCredentials {
    async fn acquire_token(&self) -> Result<AccessToken, BillingError> {
        debug!(url = %self.token_url, client_id = %self.client_id, "requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];
        let response: TokenResponse = self.http.post_form(&self.token_url, &form).await?;

        let secret = match response.access_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                return Err(BillingError::InvalidResponse(
                    "token response has no access_token".to_string(),
                ));
            }
        };

        let token = AccessToken::new(
            secret,
            Utc::now() + Duration::seconds(response.lifetime_secs()),
        );
        info!(expires_at = %token.expires_at(), "acquired access token");

        Ok(token)
    }
}
