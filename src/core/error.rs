//! Error handling - One hierarchy for every pipeline stage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source id has no registered credential
    #[error("No credential registered for source '{0}'")]
    MissingCredential(String),

    /// Transport-level failures (DNS, TLS, timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Source answered with a non-success status
    #[error("Failed to fetch data from {source_id}: HTTP {status}")]
    Connectivity { source_id: String, status: u16 },

    /// Payload shape is wrong (not a mapping, missing keys, bad JSON)
    #[error("Invalid data format: {0}")]
    Format(String),

    /// A metric field could not be coerced to its required type
    #[error("Invalid metric '{metric}': {reason}")]
    Validation { metric: String, reason: String },

    /// Model application or scoring failed
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Strategy selection failed
    #[error("Selection error: {0}")]
    Selection(String),
}

impl Error {
    /// True for both transport failures and non-success responses.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Connectivity { .. })
    }
}
