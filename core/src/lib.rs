//! Admission decision core for the BotShield gateway.
//!
//! Composes three small pieces: a copy-on-write [`SettingsCache`] with an
//! atomic on-disk mirror, the [`ReputationClient`] from the sibling crate,
//! and the pure [`AdmissionPolicy`] that turns one connection event into one
//! [`Decision`]. The [`Gateway`] wires them to a host runtime.
//!
//! [`ReputationClient`]: botshield_reputation_client::ReputationClient

pub mod cache;
pub mod config;
pub mod gateway;
pub mod policy;
pub mod settings;
pub mod store;

pub use cache::SettingsCache;
pub use config::ConfigError;
pub use config::GatewayConfig;
pub use gateway::Gateway;
pub use gateway::HostActions;
pub use gateway::StartupError;
pub use policy::AdmissionPolicy;
pub use policy::Decision;
pub use policy::FailurePolicy;
pub use policy::Outcome;
pub use settings::Settings;
pub use store::ParseError;
pub use store::SnapshotStore;
