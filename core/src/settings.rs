use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use botshield_reputation_client::SettingsPayload;

/// Immutable point-in-time copy of the remote policy configuration.
///
/// Replaced atomically by the cache, never mutated in place. Unknown fields
/// in a persisted document are ignored so older builds can read snapshots
/// written by newer ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub server_id: String,
    #[serde(default)]
    pub captcha_verify_enabled: bool,
    #[serde(default)]
    pub vpn_detector_enabled: bool,
    #[serde(default = "epoch")]
    pub fetched_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl Settings {
    /// The safe default in effect before any successful refresh: both
    /// features disabled, so a cold start can never kick anyone.
    pub fn disabled() -> Self {
        Self {
            server_id: String::new(),
            captcha_verify_enabled: false,
            vpn_detector_enabled: false,
            fetched_at: epoch(),
        }
    }

    /// Freezes a freshly fetched payload into a snapshot.
    pub fn from_payload(payload: SettingsPayload, fetched_at: DateTime<Utc>) -> Self {
        Self {
            server_id: payload.server_id,
            captcha_verify_enabled: payload.captcha_verify_enabled,
            vpn_detector_enabled: payload.vpn_detector_enabled,
            fetched_at,
        }
    }
}
