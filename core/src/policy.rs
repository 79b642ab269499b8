use std::net::IpAddr;
use std::sync::Arc;

use botshield_reputation_client::RemoteError;
use botshield_reputation_client::ReputationChecks;

use crate::cache::SettingsCache;

/// What the host should do with the connecting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Challenge,
    Deny,
}

/// Terminal result of one evaluation. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: String,
}

impl Decision {
    fn new(outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
        }
    }
}

/// How a failed remote check resolves. Fail-open admits the client so a
/// service outage never locks legitimate players out; fail-closed must be
/// chosen explicitly by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    FailOpen,
    FailClosed,
}

/// Per-connection decision engine.
///
/// Each evaluation reads the settings snapshot exactly once and holds no
/// state across evaluations, so concurrent calls share nothing mutable.
/// Given identical settings and identical remote responses the result is a
/// pure function of the IP.
pub struct AdmissionPolicy<C> {
    cache: Arc<SettingsCache>,
    checks: Arc<C>,
    failure_policy: FailurePolicy,
}

impl<C: ReputationChecks> AdmissionPolicy<C> {
    pub fn new(cache: Arc<SettingsCache>, checks: Arc<C>, failure_policy: FailurePolicy) -> Self {
        Self {
            cache,
            checks,
            failure_policy,
        }
    }

    pub async fn evaluate(&self, ip: IpAddr) -> Decision {
        let settings = self.cache.get();

        if settings.captcha_verify_enabled {
            match self.checks.check_verification(ip).await {
                // A challenged client never incurs the VPN check.
                Ok(false) => return Decision::new(Outcome::Challenge, "verification required"),
                Ok(true) => {}
                Err(error) => return self.resolve_failure(ip, "checkverify", &error),
            }
        }

        if settings.vpn_detector_enabled {
            match self.checks.check_vpn(ip).await {
                Ok(true) => return Decision::new(Outcome::Deny, "vpn/proxy detected"),
                Ok(false) => {}
                Err(error) => return self.resolve_failure(ip, "checkip", &error),
            }
        }

        Decision::new(Outcome::Allow, "no policy violation")
    }

    fn resolve_failure(&self, ip: IpAddr, check: &str, error: &RemoteError) -> Decision {
        tracing::warn!(
            %ip,
            check,
            %error,
            policy = ?self.failure_policy,
            "reputation check failed"
        );
        match self.failure_policy {
            FailurePolicy::FailOpen => Decision::new(
                Outcome::Allow,
                "reputation service unavailable; admitted in degraded mode",
            ),
            FailurePolicy::FailClosed => Decision::new(
                Outcome::Deny,
                "reputation service unavailable; connections are refused by policy",
            ),
        }
    }
}
