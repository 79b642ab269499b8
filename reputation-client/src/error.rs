use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single remote reputation call.
///
/// The variants deliberately separate "the network broke" from "the service
/// answered something we could not use" so the admission policy can apply
/// its fail-open/fail-closed rule with the right context in the logs.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection, TLS or timeout failure before a usable response arrived.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status code.
    #[error("unexpected status {status} from {endpoint}")]
    HttpStatus {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// The response body was not the JSON document the contract declares.
    #[error("malformed response body from {endpoint}: {source}")]
    MalformedBody {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but a required field was absent.
    #[error("response from {endpoint} missing required field `{field}`")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },
}

impl RemoteError {
    /// True when the failure never reached the service (or timed out), as
    /// opposed to the service answering with something unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}
