//! Ordered volume-control strategies.
//!
//! Renderer SDKs expose volume through more than one inconsistent API
//! surface. Instead of nested fallback branches, the fallback order is data:
//! each renderer profile carries a slice of strategies that are tried in
//! sequence until one succeeds.

use bridge_traits::renderer::RendererTransport;
use tracing::debug;

/// A single renderer volume mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStrategy {
    /// Direct level setter on the media session.
    DirectLevel,
    /// Setter on the nested volume object.
    VolumeObject,
    /// Session-scoped volume request object.
    SessionRequest,
}

impl VolumeStrategy {
    /// Apply this mechanism through the transport.
    pub async fn apply(
        &self,
        transport: &dyn RendererTransport,
        level: u8,
    ) -> bridge_traits::error::Result<()> {
        match self {
            VolumeStrategy::DirectLevel => transport.set_volume_level(level).await,
            VolumeStrategy::VolumeObject => transport.set_volume_attributes(level).await,
            VolumeStrategy::SessionRequest => transport.request_session_volume(level).await,
        }
    }
}

/// Try each strategy in order; the first success wins.
///
/// Returns `false` when every mechanism failed.
pub async fn apply_first(
    strategies: &[VolumeStrategy],
    transport: &dyn RendererTransport,
    level: u8,
) -> bool {
    for strategy in strategies {
        match strategy.apply(transport, level).await {
            Ok(()) => return true,
            Err(err) => {
                debug!(?strategy, error = %err, "volume mechanism failed, trying next");
            }
        }
    }
    false
}
