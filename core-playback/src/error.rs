//! # Playback Error Types

use bridge_traits::media::MediaErrorKind;
use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Track was not found in the current queue.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Failed to open or assign the audio source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    /// The stream credential is stale; the user must reconnect the account.
    #[error("Stream credential expired")]
    CredentialExpired,

    /// The local media handle reported a fault.
    #[error("Media fault: {message}")]
    MediaFault {
        kind: MediaErrorKind,
        message: String,
    },

    /// The selected output could not accept the operation.
    #[error("Output unavailable: {0}")]
    OutputUnavailable(String),

    /// Attempted operation with no active track.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from a host bridge.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if the operation may succeed when retried by the user.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::SourceError(_) | PlaybackError::OutputUnavailable(_) => true,
            PlaybackError::MediaFault { kind, .. } => matches!(kind, MediaErrorKind::Network),
            _ => false,
        }
    }

    /// Returns `true` if this failure requires re-authenticating the cloud
    /// account.
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            PlaybackError::CredentialExpired
                | PlaybackError::Bridge(BridgeError::CredentialExpired)
                | PlaybackError::MediaFault {
                    kind: MediaErrorKind::NotAuthorized,
                    ..
                }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
