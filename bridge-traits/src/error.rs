use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid segment locator: {0}")]
    InvalidLocator(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl BridgeError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Network(_) | BridgeError::OperationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
