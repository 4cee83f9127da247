//! Error types for remote API calls and credential resolution.

use thiserror::Error;

/// Result type alias for remote API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// A remote call failed. Distinct from an invocation *status*: a `Failed`
/// command is a successful call that reports a failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{action} returned HTTP {status}: {code}: {message}")]
    Service {
        action: String,
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("failed to decode {action} response: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Credentials could not be resolved. Always fatal.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("credential lookup for role {role} failed: {source}")]
    RoleLookup {
        role: String,
        #[source]
        source: ApiError,
    },
}
