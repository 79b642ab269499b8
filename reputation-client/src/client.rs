use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api_key::ApiKey;
use crate::error::RemoteError;
use crate::wire::RawSettings;
use crate::wire::VerifyResponse;
use crate::wire::VersionResponse;
use crate::wire::VpnResponse;
use crate::wire::toggle_is_on;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Settings document as the service publishes it, before the core attaches
/// a fetch timestamp and freezes it into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPayload {
    pub server_id: String,
    pub captcha_verify_enabled: bool,
    pub vpn_detector_enabled: bool,
}

/// The two per-IP checks the admission policy consults. Split out as a trait
/// so policy tests can substitute a stub for the real HTTP client.
#[async_trait]
pub trait ReputationChecks: Send + Sync {
    /// Whether the IP has completed CAPTCHA-style verification.
    async fn check_verification(&self, ip: IpAddr) -> Result<bool, RemoteError>;

    /// Whether the IP is flagged as VPN/proxy/datacenter traffic.
    async fn check_vpn(&self, ip: IpAddr) -> Result<bool, RemoteError>;
}

/// Client for the remote reputation service.
///
/// Owns the API key and transport configuration and nothing else. Each call
/// is one request bounded by the client-level timeout; on timeout the call
/// fails exactly as [`RemoteError::Transport`].
pub struct ReputationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl ReputationClient {
    pub fn new(base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: ApiKey,
        request_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Minimum supported client version published by the service.
    pub async fn check_version(&self) -> Result<String, RemoteError> {
        let endpoint = "version";
        let url = format!("{}/api/v1/version/jar", self.base_url);
        let response: VersionResponse = self.get_json(endpoint, url).await?;
        response.version.ok_or(RemoteError::MissingField {
            endpoint,
            field: "version",
        })
    }

    /// One probe of the key-test endpoint. True only on a success status.
    /// An unreachable service and a rejected key both come back false; the
    /// caller's startup policy decides what to make of that ambiguity.
    pub async fn validate_key(&self) -> bool {
        let url = format!("{}/api/v1/{}/test/", self.base_url, self.api_key.expose());
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::warn!(key = %self.api_key, %error, "api key probe failed");
                false
            }
        }
    }

    /// Fetches the current policy document. `serverid` is required; the
    /// feature toggles default to off when absent or unrecognized.
    pub async fn fetch_settings(&self) -> Result<SettingsPayload, RemoteError> {
        let endpoint = "settings";
        let url = format!(
            "{}/api/v1/{}/settings/get",
            self.base_url,
            self.api_key.expose()
        );
        let raw: RawSettings = self.get_json(endpoint, url).await?;
        let server_id = raw
            .server_id
            .filter(|id| !id.is_empty())
            .ok_or(RemoteError::MissingField {
                endpoint,
                field: "serverid",
            })?;
        Ok(SettingsPayload {
            server_id,
            captcha_verify_enabled: toggle_is_on(raw.captcha_verify.as_deref()),
            vpn_detector_enabled: toggle_is_on(raw.vpn_detector.as_deref()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: String,
    ) -> Result<T, RemoteError> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus { endpoint, status });
        }
        let body = response.bytes().await.map_err(RemoteError::Transport)?;
        serde_json::from_slice(&body).map_err(|source| RemoteError::MalformedBody {
            endpoint,
            source,
        })
    }
}

#[async_trait]
impl ReputationChecks for ReputationClient {
    async fn check_verification(&self, ip: IpAddr) -> Result<bool, RemoteError> {
        let endpoint = "checkverify";
        let url = format!(
            "{}/api/v1/{}/checkverify/{ip}",
            self.base_url,
            self.api_key.expose()
        );
        let response: VerifyResponse = self.get_json(endpoint, url).await?;
        response.is_verified().ok_or(RemoteError::MissingField {
            endpoint,
            field: "verified",
        })
    }

    async fn check_vpn(&self, ip: IpAddr) -> Result<bool, RemoteError> {
        let endpoint = "checkip";
        let url = format!(
            "{}/api/v1/{}/checkip/{ip}",
            self.base_url,
            self.api_key.expose()
        );
        let response: VpnResponse = self.get_json(endpoint, url).await?;
        response.is_vpn.ok_or(RemoteError::MissingField {
            endpoint,
            field: "isVpn",
        })
    }
}
