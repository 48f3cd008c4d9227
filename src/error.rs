//! Error types for leader-beacon

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeaconError {
    /// No coordinator candidate was reachable or reported a leader
    #[error("No leader found among candidates: {0}")]
    NoLeader(String),

    /// The leader answered but its state document could not be used
    #[error("State unavailable from {endpoint}: {reason}")]
    StateUnavailable { endpoint: String, reason: String },

    /// No service descriptor matched a watch target's prefix
    #[error("No service matching '{0}' in cluster state")]
    NotFound(String),

    /// A service advertised an address we cannot turn into host:port
    #[error("Malformed address '{address}': {reason}")]
    MalformedAddress { address: String, reason: String },

    /// The registry was unreachable or rejected the registration
    #[error("Publish of '{id}' failed: {reason}")]
    PublishFailed { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BeaconError>;

impl BeaconError {
    pub(crate) fn malformed(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedAddress {
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}
