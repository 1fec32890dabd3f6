//! Run configuration.
//!
//! Settings are resolved once at startup, in order of precedence:
//! 1. command-line flags and environment variables
//! 2. the TOML settings file (`~/.config/ri-sp-audit/config.toml` or `--config`)
//! 3. built-in defaults
//!
//! Credentials only ever come from flags or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audit::{DEFAULT_UTILIZATION, PipelineOptions, Policy, UNDERUTILIZATION_THRESHOLD};
use crate::billing::{Credentials, RetryPolicy};
use crate::types::CommitmentType;

const CONFIG_DIR: &str = "ri-sp-audit";
const CONFIG_FILE: &str = "config.toml";

/// Settings accepted on the command line or from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Settings file (default: ~/.config/ri-sp-audit/config.toml)
    #[arg(long, env = "AUDIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory tenant ID
    #[arg(long, env = "AZURE_TENANT_ID", global = true)]
    pub tenant_id: Option<String>,

    /// Application (client) ID
    #[arg(long, env = "AZURE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Application client secret
    #[arg(long, env = "AZURE_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Identity endpoint base URL
    #[arg(long, env = "AUDIT_AUTHORITY_URL", global = true)]
    pub authority_url: Option<String>,

    /// Management API base URL
    #[arg(long, env = "AUDIT_MANAGEMENT_URL", global = true)]
    pub management_url: Option<String>,

    /// Directory the report is written to
    #[arg(long, short = 'o', env = "AUDIT_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Utilization percentage below which a commitment is reported
    #[arg(long, env = "AUDIT_THRESHOLD", global = true)]
    pub threshold: Option<f64>,

    /// Number of usage fetches to run concurrently
    #[arg(long, short = 'j', env = "AUDIT_CONCURRENCY", global = true)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "AUDIT_REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,

    /// Retries for throttled or failed requests
    #[arg(long, env = "AUDIT_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, env = "AUDIT_DEADLINE_SECS", global = true)]
    pub deadline_secs: Option<u64>,
}

/// Settings file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    #[serde(default = "default_management_url")]
    pub management_url: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Utilization assumed for usage records without a value.
    #[serde(default = "default_utilization")]
    pub default_utilization: f64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_management_url() -> String {
    "https://management.azure.com".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_threshold() -> f64 {
    UNDERUTILIZATION_THRESHOLD
}

fn default_utilization() -> f64 {
    DEFAULT_UTILIZATION
}

fn default_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_secs() -> u64 {
    30
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            authority_url: default_authority_url(),
            management_url: default_management_url(),
            output_dir: default_output_dir(),
            threshold: default_threshold(),
            default_utilization: default_utilization(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            deadline_secs: None,
        }
    }
}

impl FileConfig {
    /// Load the settings file.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug)]
pub struct AuditConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub authority_url: String,
    pub management_url: String,
    pub output_dir: PathBuf,
    pub policy: Policy,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub deadline: Option<Duration>,
}

impl AuditConfig {
    /// Resolve flags and environment over the settings file.
    pub fn resolve(args: &SettingsArgs) -> Result<Self> {
        let file = FileConfig::load(args.config.as_deref())?;
        Self::from_parts(args, file)
    }

    pub fn from_parts(args: &SettingsArgs, file: FileConfig) -> Result<Self> {
        let mut config = Self {
            tenant_id: non_empty(args.tenant_id.clone()),
            client_id: non_empty(args.client_id.clone()),
            client_secret: non_empty(args.client_secret.clone()).map(SecretString::from),
            authority_url: args.authority_url.clone().unwrap_or(file.authority_url),
            management_url: args.management_url.clone().unwrap_or(file.management_url),
            output_dir: args.output_dir.clone().unwrap_or(file.output_dir),
            policy: Policy {
                threshold: args.threshold.unwrap_or(file.threshold),
                default_utilization: file.default_utilization,
            },
            concurrency: args.concurrency.unwrap_or(file.concurrency),
            request_timeout: Duration::from_secs(
                args.request_timeout_secs.unwrap_or(file.request_timeout_secs),
            ),
            retry: RetryPolicy::new(
                args.max_retries.unwrap_or(file.max_retries),
                Duration::from_millis(file.backoff_initial_ms),
                Duration::from_secs(file.backoff_max_secs),
            ),
            deadline: args
                .deadline_secs
                .or(file.deadline_secs)
                .map(Duration::from_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&mut self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.policy.threshold) {
            bail!("threshold must be between 0 and 100, got {}", self.policy.threshold);
        }
        if !(0.0..=100.0).contains(&self.policy.default_utilization) {
            bail!(
                "default_utilization must be between 0 and 100, got {}",
                self.policy.default_utilization
            );
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be at least one second");
        }
        if self.concurrency == 0 {
            warn!("concurrency of 0 requested, using 1");
            self.concurrency = 1;
        }
        Ok(())
    }

    /// Credentials for the token exchange, or which variables are missing.
    pub fn credentials(&self) -> Result<Credentials> {
        let mut missing = Vec::new();
        if self.tenant_id.is_none() {
            missing.push("AZURE_TENANT_ID");
        }
        if self.client_id.is_none() {
            missing.push("AZURE_CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("AZURE_CLIENT_SECRET");
        }

        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant_id), Some(client_id), Some(secret)) => Ok(Credentials {
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: SecretString::from(secret.expose_secret().to_owned()),
            }),
            _ => bail!("missing credentials: set {}", missing.join(", ")),
        }
    }

    pub fn pipeline_options(&self, kinds: &[CommitmentType]) -> PipelineOptions {
        let kinds = if kinds.is_empty() {
            CommitmentType::ALL.to_vec()
        } else {
            let mut kinds = kinds.to_vec();
            kinds.sort();
            kinds.dedup();
            kinds
        };

        PipelineOptions {
            kinds,
            policy: self.policy,
            concurrency: self.concurrency,
            deadline: self.deadline,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
