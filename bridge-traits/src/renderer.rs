//! Renderer transport and device discovery contracts.
//!
//! A renderer is an external device or OS-level sink that plays audio
//! independently of the local media handle: a cast receiver, an AirPlay
//! target, a UPnP/DLNA media renderer, or a Bluetooth sink. Each class is
//! backed by a platform plugin that this crate only sees as a black-box
//! `RendererTransport`.
//!
//! Renderer SDKs are notoriously inconsistent about volume control: some
//! expose a direct level setter, some a nested volume object, some a
//! session-scoped volume request. The transport surfaces all three so the
//! adapter layer can try them in a defined order; a transport returns
//! [`BridgeError::NotAvailable`](crate::error::BridgeError::NotAvailable)
//! for mechanisms its SDK does not offer.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

/// Remote rendering technology class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityClass {
    Cast,
    AirPlay,
    Upnp,
    Bluetooth,
}

/// A discoverable remote output device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Opaque identifier assigned by the platform plugin.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    pub class: CapabilityClass,
}

/// Media descriptor handed to a renderer when starting playback.
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    /// Stream URL, already credentialed; the renderer fetches it directly.
    pub url: String,
    pub title: String,
    pub content_type: String,
    /// Offset to start playing from.
    pub start: Duration,
}

/// Raw playback snapshot reported by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportStatus {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    /// Renderer-reported volume, `0..=100`.
    pub volume: u8,
    pub muted: bool,
    /// Display name, when the renderer reports one alongside status.
    pub device_name: Option<String>,
}

impl Default for TransportStatus {
    fn default() -> Self {
        Self {
            position: Duration::ZERO,
            duration: None,
            playing: false,
            volume: 100,
            muted: false,
            device_name: None,
        }
    }
}

/// Session-lifecycle notifications pushed by the platform plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotification {
    /// A session was established with the identified device.
    SessionStarted { device_id: String },
    /// The session ended from the renderer side (device powered off,
    /// another sender took over, etc.).
    SessionEnded { device_id: String },
    /// A new device became visible.
    DeviceDiscovered(DeviceDescriptor),
}

/// Black-box control surface over one renderer device.
///
/// All operations are asynchronous and may suspend on the network or on a
/// native UI. Implementations translate SDK-specific failures into
/// `BridgeError`; the adapter layer above never lets those reach the
/// playback controller.
#[async_trait]
pub trait RendererTransport: Send + Sync {
    /// Capability class this transport drives.
    fn class(&self) -> CapabilityClass;

    /// Establish or reuse a session. May surface a native device picker;
    /// returns `Ok(false)` when the user cancels it.
    async fn connect(&self) -> Result<bool>;

    /// Tear down the session. Must tolerate an already-absent session.
    async fn disconnect(&self) -> Result<()>;

    /// Whether a session is still alive on the renderer side, regardless of
    /// whether the local handle to it survived.
    async fn has_session(&self) -> bool;

    /// Re-attach to a live session after the local handle was lost. Returns
    /// `Ok(false)` if there is nothing to re-attach to.
    async fn reacquire(&self) -> Result<bool>;

    /// Load media and begin fetching from `media.start`.
    async fn load(&self, media: MediaDescriptor) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Seek to `position`. When `resume` is set the renderer is asked to
    /// continue playing once the seek lands rather than staying paused.
    async fn seek(&self, position: Duration, resume: bool) -> Result<()>;

    /// Direct volume level setter, `0..=100`.
    async fn set_volume_level(&self, level: u8) -> Result<()>;

    /// Setter on the nested volume object, `0..=100`.
    async fn set_volume_attributes(&self, level: u8) -> Result<()>;

    /// Session-scoped volume request, `0..=100`.
    async fn request_session_volume(&self, level: u8) -> Result<()>;

    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Fetch the renderer's current playback snapshot.
    async fn fetch_status(&self) -> Result<TransportStatus>;

    /// Subscribe to session-lifecycle notifications.
    fn notifications(&self) -> broadcast::Receiver<SessionNotification>;
}

/// Capability query over the devices a platform plugin can currently see.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    async fn available_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Subscribe to discovery notifications (`DeviceDiscovered`,
    /// `SessionStarted`, `SessionEnded`).
    fn notifications(&self) -> broadcast::Receiver<SessionNotification>;
}
