//! Wire structs for the reputation service's JSON documents.
//!
//! Flexible on purpose: unknown fields are ignored, optional fields default
//! to absent, and flag values outside the documented vocabulary read as the
//! conservative option, so backend additions never break the client.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub version: Option<String>,
}

/// `"on"` / `"off"` feature toggle; anything else reads as off.
pub(crate) fn toggle_is_on(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("on"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSettings {
    #[serde(default, rename = "serverid")]
    pub server_id: Option<String>,
    #[serde(default, rename = "captchaverify")]
    pub captcha_verify: Option<String>,
    #[serde(default, rename = "vpndetector")]
    pub vpn_detector: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    /// `"yes"` / `"no"`; anything else reads as unverified.
    #[serde(default)]
    pub verified: Option<String>,
}

impl VerifyResponse {
    pub(crate) fn is_verified(&self) -> Option<bool> {
        self.verified
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("yes"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VpnResponse {
    #[serde(default, rename = "isVpn")]
    pub is_vpn: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::unwrap_used)]
    fn toggles_tolerate_unrecognized_values() {
        let raw: RawSettings = serde_json::from_str(
            r#"{"serverid":"srv-1","captchaverify":"auto","vpndetector":"on","extra":1}"#,
        )
        .unwrap();
        assert_eq!(raw.server_id.as_deref(), Some("srv-1"));
        assert!(!toggle_is_on(raw.captcha_verify.as_deref()));
        assert!(toggle_is_on(raw.vpn_detector.as_deref()));
        assert!(!toggle_is_on(None));
    }

    #[test]
    #[expect(clippy::unwrap_used)]
    fn verify_response_reads_yes_and_no() {
        let yes: VerifyResponse = serde_json::from_str(r#"{"verified":"yes"}"#).unwrap();
        let no: VerifyResponse = serde_json::from_str(r#"{"verified":"no"}"#).unwrap();
        let absent: VerifyResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(yes.is_verified(), Some(true));
        assert_eq!(no.is_verified(), Some(false));
        assert_eq!(absent.is_verified(), None);
    }
}
