//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback engine and its
//! external collaborators. Each trait represents a capability the engine
//! requires but that is provided elsewhere: the local media handle, the
//! per-class renderer transports and their discovery plugins, the track
//! queue supplier, and the stream credential source.
//!
//! ## Traits
//!
//! - [`MediaHandle`](media::MediaHandle) - local audio primitive with
//!   buffering telemetry and a lifecycle event channel
//! - [`RendererTransport`](renderer::RendererTransport) - black-box control
//!   surface over one cast/AirPlay/UPnP/Bluetooth device
//! - [`DeviceDiscovery`](renderer::DeviceDiscovery) - capability query over
//!   visible remote devices
//! - [`QueueSource`](queue::QueueSource) - ordered track list supplier
//! - [`CredentialSource`](auth::CredentialSource) - bearer credential for
//!   stream URLs
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform-specific errors to `BridgeError`
//! and reserve `Declined` strictly for user cancellations, which callers
//! treat as non-error outcomes.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared freely across async tasks.

pub mod auth;
pub mod error;
pub mod media;
pub mod queue;
pub mod renderer;

pub use error::BridgeError;

// Re-export commonly used types
pub use auth::{CredentialAttachment, CredentialSource};
pub use media::{BufferedRange, MediaErrorKind, MediaEvent, MediaHandle, ReadyState};
pub use queue::{QueueSource, Track};
pub use renderer::{
    CapabilityClass, DeviceDescriptor, DeviceDiscovery, MediaDescriptor, RendererTransport,
    SessionNotification, TransportStatus,
};
