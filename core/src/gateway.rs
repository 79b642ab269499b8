use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;

use botshield_reputation_client::RemoteError;
use botshield_reputation_client::ReputationClient;
use botshield_reputation_client::version_supported;

use crate::cache::SettingsCache;
use crate::config::ConfigError;
use crate::config::GatewayConfig;
use crate::policy::AdmissionPolicy;
use crate::policy::Decision;
use crate::policy::Outcome;
use crate::settings::Settings;
use crate::store::SnapshotStore;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Actions the host runtime applies on our behalf. One of these is called
/// exactly once per connection event.
#[async_trait]
pub trait HostActions: Send + Sync {
    async fn allow(&self, ip: IpAddr);
    async fn challenge(&self, ip: IpAddr, message: String);
    async fn deny(&self, ip: IpAddr, message: String);
}

/// Fatal startup failure. The host is expected to refuse to start the
/// admission feature, not the whole process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("api key rejected by the reputation service (or service unreachable)")]
    InvalidApiKey,

    #[error("this build ({current}) is older than the minimum supported version {required}")]
    UnsupportedVersion { current: String, required: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Entry point a host embeds: owns the client, the cache and the policy,
/// and turns connection events into host actions.
pub struct Gateway<H> {
    client: Arc<ReputationClient>,
    cache: Arc<SettingsCache>,
    policy: AdmissionPolicy<ReputationClient>,
    host: Arc<H>,
    verify_site: String,
}

impl<H> std::fmt::Debug for Gateway<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("verify_site", &self.verify_site)
            .finish_non_exhaustive()
    }
}

impl<H: HostActions + 'static> Gateway<H> {
    /// Startup sequence: config validation, version gate and key validation
    /// are fatal; a failed settings fetch is not, and the gateway continues
    /// with the persisted snapshot or the safe defaults.
    pub async fn start(config: GatewayConfig, host: Arc<H>) -> Result<Arc<Self>, StartupError> {
        config.validate()?;
        let api_key = config.api_key()?;
        let client = Arc::new(ReputationClient::with_timeout(
            config.base_url.clone(),
            api_key,
            config.request_timeout,
        ));

        let required = client.check_version().await?;
        if !version_supported(CURRENT_VERSION, &required) {
            return Err(StartupError::UnsupportedVersion {
                current: CURRENT_VERSION.to_string(),
                required,
            });
        }

        if !client.validate_key().await {
            return Err(StartupError::InvalidApiKey);
        }
        tracing::info!(key = %client.api_key(), "api key accepted");

        let cache = Arc::new(match config.snapshot_path.clone() {
            Some(path) => SettingsCache::with_store(SnapshotStore::new(path)),
            None => SettingsCache::new(),
        });

        let gateway = Arc::new(Self {
            policy: AdmissionPolicy::new(
                cache.clone(),
                client.clone(),
                config.failure_policy,
            ),
            verify_site: config.verify_site().to_string(),
            client,
            cache: cache.clone(),
            host,
        });

        if let Err(error) = gateway.refresh_settings().await {
            tracing::warn!(
                %error,
                server_id = %cache.get().server_id,
                "settings fetch failed; continuing with last-known-good settings"
            );
        }

        Ok(gateway)
    }

    /// Inbound boundary. Each connection event runs on its own task, so a
    /// slow reputation service delays only the client being evaluated.
    pub fn on_client_connecting(self: &Arc<Self>, ip: IpAddr) -> JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            let decision = gateway.policy.evaluate(ip).await;
            gateway.apply(ip, decision).await;
        })
    }

    /// Evaluates without dispatching a host action. Exposed for hosts that
    /// drive their own accept pipeline.
    pub async fn evaluate(&self, ip: IpAddr) -> Decision {
        self.policy.evaluate(ip).await
    }

    async fn apply(&self, ip: IpAddr, decision: Decision) {
        tracing::debug!(%ip, outcome = ?decision.outcome, reason = %decision.reason, "admission decision");
        match decision.outcome {
            Outcome::Allow => self.host.allow(ip).await,
            Outcome::Challenge => {
                let server_id = self.cache.get().server_id.clone();
                self.host.challenge(ip, self.challenge_message(&server_id)).await;
            }
            Outcome::Deny => self.host.deny(ip, self.deny_message(&decision.reason)).await,
        }
    }

    fn challenge_message(&self, server_id: &str) -> String {
        format!(
            "Please visit {}/server/{server_id}/verify and complete the verification before joining again.",
            self.verify_site
        )
    }

    fn deny_message(&self, reason: &str) -> String {
        format!("Connection refused: {reason}. Protected by BotShield ({}).", self.verify_site)
    }

    /// Fetches the current policy document and swaps it into the cache.
    /// Runs concurrently with evaluations; readers only ever see the old or
    /// the new snapshot.
    pub async fn refresh_settings(&self) -> Result<(), RemoteError> {
        let payload = self.client.fetch_settings().await?;
        let settings = Settings::from_payload(payload, Utc::now());
        tracing::info!(
            server_id = %settings.server_id,
            captcha_verify = settings.captcha_verify_enabled,
            vpn_detector = settings.vpn_detector_enabled,
            "settings refreshed"
        );
        self.cache.replace(settings);
        Ok(())
    }

    /// On-demand reload: re-validate the key, then re-fetch settings.
    pub async fn reload(&self) -> Result<(), StartupError> {
        if !self.client.validate_key().await {
            return Err(StartupError::InvalidApiKey);
        }
        self.refresh_settings().await?;
        Ok(())
    }

    /// Periodic refresh, independent of per-client evaluation. Failures are
    /// logged and the previous snapshot stays in effect.
    pub fn spawn_refresh_loop(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(error) = gateway.refresh_settings().await {
                    tracing::warn!(%error, "periodic settings refresh failed");
                }
            }
        })
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.cache.get()
    }
}
