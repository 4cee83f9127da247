//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration parsing and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A required setting is missing or malformed. Always fatal, raised before
/// any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is empty")]
    Missing(&'static str),

    #[error("malformed tag entry {0:?}: expected key=value")]
    MalformedTag(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
