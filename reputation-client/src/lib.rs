//! Typed client for the BotShield reputation service.
//!
//! Every call is a single bounded-timeout request; retry policy belongs to
//! the caller, never to this crate. Responses are parsed against declared
//! wire structs: unknown fields are ignored for forward compatibility, and
//! missing required fields surface as [`RemoteError::MissingField`].

mod api_key;
mod client;
mod error;
mod version;
mod wire;

pub use api_key::ApiKey;
pub use client::ReputationChecks;
pub use client::ReputationClient;
pub use client::SettingsPayload;
pub use error::RemoteError;
pub use version::version_supported;
