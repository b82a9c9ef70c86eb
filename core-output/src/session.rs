//! Remote session record.

use bridge_traits::renderer::DeviceDescriptor;
use std::time::Duration;
use uuid::Uuid;

/// Connection lifecycle of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Last playback clock reported by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteClock {
    pub position: Duration,
    pub duration: Option<Duration>,
    pub playing: bool,
    /// Renderer-reported volume, `0..=100`.
    pub volume: u8,
    pub muted: bool,
}

/// A live session against one remote device.
///
/// Created on connect, destroyed on disconnect or a session-ended
/// notification from the transport. Owned exclusively by its adapter; the
/// rest of the engine only ever reads the republished status channel.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    /// Local identifier for this session instance.
    pub id: Uuid,
    pub device: DeviceDescriptor,
    pub status: ConnectionStatus,
    pub clock: RemoteClock,
}

impl RemoteSession {
    /// A session record for a connection attempt in progress.
    pub fn connecting(device: DeviceDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            status: ConnectionStatus::Connecting,
            clock: RemoteClock::default(),
        }
    }

    /// A session record for an established connection.
    pub fn connected(device: DeviceDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
            status: ConnectionStatus::Connected,
            clock: RemoteClock::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}
