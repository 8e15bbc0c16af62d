//! Error types for Stepcase

use thiserror::Error;

/// Result type alias using Stepcase Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stepcase error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Agent unavailable at {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("Agent at {url} returned status {status}: {body}")]
    UpstreamStatus { url: String, status: u16, body: String },

    #[error("Agent at {url} returned an unreadable body: {reason}")]
    UpstreamBody { url: String, reason: String },

    #[error("Agent reply is missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True when the failure came from talking to an external agent.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable { .. }
                | Error::UpstreamStatus { .. }
                | Error::UpstreamBody { .. }
        )
    }
}
