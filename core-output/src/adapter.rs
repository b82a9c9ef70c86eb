//! Uniform output adapter contract.
//!
//! The playback controller never branches on renderer technology except to
//! pick which adapter is active. Every transport operation returns a
//! success/failure outcome instead of an error: adapters swallow
//! transport-specific failures, log them, and surface user-relevant ones as
//! notice events.

use async_trait::async_trait;
use bridge_traits::renderer::CapabilityClass;
use std::time::Duration;
use tokio::sync::watch;

/// Which rendering technology an adapter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// The local media handle renders audio on this device.
    Local,
    Cast,
    AirPlay,
    Upnp,
    Bluetooth,
}

impl From<CapabilityClass> for OutputKind {
    fn from(class: CapabilityClass) -> Self {
        match class {
            CapabilityClass::Cast => OutputKind::Cast,
            CapabilityClass::AirPlay => OutputKind::AirPlay,
            CapabilityClass::Upnp => OutputKind::Upnp,
            CapabilityClass::Bluetooth => OutputKind::Bluetooth,
        }
    }
}

impl OutputKind {
    pub fn is_remote(&self) -> bool {
        !matches!(self, OutputKind::Local)
    }
}

/// Operations an adapter declared support for at construction time.
///
/// Resolved once from the renderer profile; callers consult this instead of
/// probing for capabilities at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpsSupport {
    pub seek: bool,
    pub volume: bool,
    pub mute: bool,
}

impl OpsSupport {
    /// Everything supported; what local playback offers.
    pub fn full() -> Self {
        Self {
            seek: true,
            volume: true,
            mute: true,
        }
    }
}

/// Everything needed to start playback of one track on an output.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Stream URL, already credentialed.
    pub url: String,
    pub title: String,
    /// MIME type advertised to the renderer. Empty means "use the profile
    /// default".
    pub content_type: String,
    /// Offset to start playing from.
    pub start: Duration,
}

/// Merged output status republished on the adapter's status channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    /// Output-reported volume, `0..=100`.
    pub volume: u8,
    pub muted: bool,
    pub device_name: String,
}

impl Default for RemoteStatus {
    fn default() -> Self {
        Self {
            position: Duration::ZERO,
            duration: None,
            playing: false,
            volume: 100,
            muted: false,
            device_name: String::new(),
        }
    }
}

/// Shared configuration for output adapters.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Cadence of the status poller.
    pub status_poll_interval: Duration,
    /// How long the busy guard stays held after a seek/load completes.
    pub busy_hold: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            status_poll_interval: Duration::from_secs(1),
            busy_hold: Duration::from_secs(3),
        }
    }
}

/// Uniform transport contract over heterogeneous output technologies.
///
/// At most one adapter is active at a time; the controller enforces the
/// pause-before-switch invariant when changing outputs.
#[async_trait]
pub trait OutputAdapter: Send + Sync {
    fn kind(&self) -> OutputKind;

    /// Operations this adapter supports, resolved at construction.
    fn supported_ops(&self) -> OpsSupport;

    /// Display name of the device this adapter drives.
    fn device_name(&self) -> String;

    /// Opaque device identifier, `None` for local playback.
    fn device_id(&self) -> Option<String> {
        None
    }

    async fn is_connected(&self) -> bool;

    /// Establish or reuse a session. User cancellation of a device picker
    /// returns `false` without surfacing an error.
    async fn connect(&self) -> bool;

    /// Tear down the session: stop in-flight media, then release the session
    /// handle. Idempotent; tolerates an already-absent session.
    async fn disconnect(&self);

    /// Start playback of a track from an offset, connecting first if
    /// needed.
    async fn load_media(&self, request: LoadRequest) -> bool;

    async fn play(&self) -> bool;

    async fn pause(&self) -> bool;

    async fn stop(&self) -> bool;

    /// Renderer-native seek requesting playback to continue afterwards.
    async fn seek(&self, position: Duration) -> bool;

    /// Best-effort volume change, `0..=100`.
    async fn set_volume(&self, level: u8) -> bool;

    async fn set_muted(&self, muted: bool) -> bool;

    /// Passive status channel fed by the adapter's poller.
    fn status(&self) -> watch::Receiver<RemoteStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_kind_from_capability_class() {
        assert_eq!(OutputKind::from(CapabilityClass::Cast), OutputKind::Cast);
        assert_eq!(
            OutputKind::from(CapabilityClass::Bluetooth),
            OutputKind::Bluetooth
        );
    }

    #[test]
    fn only_local_is_not_remote() {
        assert!(!OutputKind::Local.is_remote());
        assert!(OutputKind::Cast.is_remote());
        assert!(OutputKind::AirPlay.is_remote());
        assert!(OutputKind::Upnp.is_remote());
        assert!(OutputKind::Bluetooth.is_remote());
    }

    #[test]
    fn default_output_config() {
        let config = OutputConfig::default();
        assert_eq!(config.status_poll_interval, Duration::from_secs(1));
        assert_eq!(config.busy_hold, Duration::from_secs(3));
    }
}
