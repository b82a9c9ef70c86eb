//! # Playback Engine Core
//!
//! The adaptive playback buffering and remote-output synchronization engine:
//!
//! - [`BufferMonitor`](buffer::BufferMonitor) - decides when enough of a
//!   range-limited remote stream is buffered to start playback without
//!   stalling
//! - [`PlayerController`](controller::PlayerController) - owns the session:
//!   play/pause/seek intent, active output selection, the staged load
//!   pipeline, and the local media handle
//! - [`Reconciler`](reconcile::Reconciler) - merges local and remote
//!   telemetry into one view model under one-way-authority rules
//! - [`PlayerStore`](store::PlayerStore) - process-local resume offsets,
//!   discovered durations, and output preferences

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod intent;
pub mod reconcile;
pub mod store;

pub use buffer::{BufferMonitor, BufferOutcome, BufferState};
pub use config::{BufferPolicy, PlayerConfig};
pub use controller::PlayerController;
pub use error::{PlaybackError, Result};
pub use intent::{PlaybackIntent, PlayerState, RepeatMode};
pub use reconcile::{NowPlaying, Reconciler};
pub use store::PlayerStore;
