//! # Remote Output Module
//!
//! Presents a uniform transport contract over heterogeneous output
//! technologies so the playback controller never branches on renderer type
//! except to pick which adapter is active.
//!
//! ## Overview
//!
//! - [`OutputAdapter`](adapter::OutputAdapter) - the uniform contract
//!   (connect, load, play/pause/stop, seek, volume, status channel)
//! - [`RendererOutput`](renderer::RendererOutput) - profile-driven adapter
//!   over a black-box [`RendererTransport`](bridge_traits::renderer::RendererTransport)
//!   for cast/AirPlay/UPnP/Bluetooth devices
//! - [`LocalOutput`](local::LocalOutput) - the local media handle behind the
//!   same contract
//! - [`VolumeStrategy`](volume::VolumeStrategy) - ordered volume mechanisms
//! - [`BusyGuard`](busy::BusyGuard) - suppresses stale telemetry around
//!   in-flight seeks and loads
//!
//! ## Failure semantics
//!
//! Adapter operations return boolean outcomes and never propagate transport
//! errors to the controller. User cancellation of a device picker is a
//! `false` outcome, not an error. A session error during an active session
//! clears the session record and is not retried automatically.

pub mod adapter;
pub mod busy;
pub mod discovery;
pub mod local;
pub mod renderer;
pub mod session;
pub mod volume;

pub use adapter::{
    LoadRequest, OpsSupport, OutputAdapter, OutputConfig, OutputKind, RemoteStatus,
};
pub use busy::BusyGuard;
pub use discovery::forward_discovery;
pub use local::LocalOutput;
pub use renderer::{RendererOutput, RendererProfile};
pub use session::{ConnectionStatus, RemoteClock, RemoteSession};
pub use volume::VolumeStrategy;
