use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The user dismissed a native prompt (e.g., a device picker). Callers
    /// must treat this as a non-error outcome, never as a failure to report.
    #[error("Request declined by the user: {0}")]
    Declined(String),

    #[error("Stream credential expired or revoked")]
    CredentialExpired,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` if this error represents a user cancellation rather
    /// than a real failure.
    pub fn is_declined(&self) -> bool {
        matches!(self, BridgeError::Declined(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
