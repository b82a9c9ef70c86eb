//! Stream credential contract.
//!
//! The cloud authentication flow is out of scope; the engine only needs the
//! current bearer token when resolving a stream URL, plus a typed signal
//! when the credential has gone stale so playback can be aborted with a
//! "reconnect required" notice instead of being retried blindly.

use crate::error::Result;
use async_trait::async_trait;

/// Where the bearer credential is carried on stream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialAttachment {
    /// Appended to the URL as an `access_token` query parameter.
    QueryParameter,
    /// Sent as an Authorization header by the media handle; the URL is left
    /// untouched.
    Header,
    /// The URL is pre-signed; nothing to attach.
    None,
}

/// Supplies the bearer credential for stream URLs.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The current access token.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CredentialExpired`](crate::error::BridgeError::CredentialExpired)
    /// when the token is stale and cannot be refreshed without user
    /// interaction.
    async fn access_token(&self) -> Result<String>;

    /// How the credential is attached to stream requests.
    fn attachment(&self) -> CredentialAttachment;
}
