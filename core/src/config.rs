use std::path::PathBuf;
use std::time::Duration;

use botshield_reputation_client::ApiKey;
use thiserror::Error;

use crate::policy::FailurePolicy;

pub const DEFAULT_BASE_URL: &str = "https://botshield.filps.software";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing or empty api key")]
    MissingApiKey,

    #[error("base url must not be empty")]
    EmptyBaseUrl,
}

/// Everything the gateway needs, passed in explicitly so the core can be
/// constructed and tested without a host runtime. How the host obtains
/// these values (config file, env) is its own concern.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Root URL of the reputation service.
    pub base_url: String,
    /// Raw credential as the host loaded it; validated in [`Self::api_key`].
    pub api_key: String,
    /// Hard bound on every remote call.
    pub request_timeout: Duration,
    /// How a failed remote check on the admission path resolves.
    pub failure_policy: FailurePolicy,
    /// Where to mirror the last-known-good settings snapshot; `None`
    /// disables persistence.
    pub snapshot_path: Option<PathBuf>,
    /// Public site used in challenge messages; defaults to `base_url`.
    pub verify_site: Option<String>,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            failure_policy: FailurePolicy::default(),
            snapshot_path: None,
            verify_site: None,
        }
    }

    pub fn api_key(&self) -> Result<ApiKey, ConfigError> {
        ApiKey::new(self.api_key.as_str()).ok_or(ConfigError::MissingApiKey)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        self.api_key().map(|_| ())
    }

    pub fn verify_site(&self) -> &str {
        self.verify_site
            .as_deref()
            .unwrap_or(self.base_url.as_str())
            .trim_end_matches('/')
    }
}
