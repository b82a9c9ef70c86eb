//! Local media handle abstraction.
//!
//! The media handle is the host-provided primitive that downloads and renders
//! a stream URL on the local device. It reports buffering telemetry (buffered
//! ranges, a ready-state ordinal, duration once metadata arrives) and pushes
//! lifecycle events over a broadcast channel. Hosts back this with whatever
//! their platform offers (a media element on web views, a decoder pipeline on
//! desktop); the core only relies on the contract below.
//!
//! Event delivery is best-effort: handles loading range-limited, cross-origin
//! sources are known to fire buffering events inconsistently, so consumers
//! must pair the event channel with periodic polling of the telemetry
//! getters.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

/// Ready-state ordinal reported by a media handle, ordered weakest to
/// strongest. Comparisons follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Nothing is known about the stream yet.
    HaveNothing,
    /// Duration and format metadata are available.
    HaveMetadata,
    /// Data for the current playback position is available.
    HaveCurrentData,
    /// Data for the current position and at least a short span ahead is
    /// available.
    HaveFutureData,
    /// Enough data is buffered to play through to the end without stalling.
    HaveEnoughData,
}

/// A single contiguous buffered span of the stream, in stream time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedRange {
    pub start: Duration,
    pub end: Duration,
}

impl BufferedRange {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `position` falls inside this span.
    pub fn contains(&self, position: Duration) -> bool {
        self.start <= position && position <= self.end
    }

    /// Length of the span. Inverted ranges report zero.
    pub fn len(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Classified cause of a media handle failure, derived by the host from the
/// underlying error code and source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    /// The source rejected the request; the stream credential is stale or
    /// missing.
    NotAuthorized,
    /// A network failure or timeout interrupted fetching.
    Network,
    /// The stream was fetched but could not be decoded.
    Decode,
    /// The container or codec is not supported by this handle.
    UnsupportedFormat,
}

/// Lifecycle and buffering events emitted by a media handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Duration and format metadata became available.
    LoadedMetadata,
    /// The first frame of data at the current position arrived.
    LoadedData,
    /// More of the stream was fetched; buffered ranges changed.
    Progress,
    /// Playback could start, though it may still stall.
    CanPlay,
    /// The handle estimates it can play through without stalling.
    CanPlayThrough,
    /// Rendering started or resumed.
    Playing,
    /// Rendering paused.
    Paused,
    /// End of the stream was reached.
    Ended,
    /// An unrecoverable error occurred.
    Error(MediaErrorKind),
}

impl MediaEvent {
    /// Returns `true` for events that indicate buffering telemetry changed.
    pub fn is_buffer_signal(&self) -> bool {
        matches!(
            self,
            MediaEvent::LoadedMetadata
                | MediaEvent::LoadedData
                | MediaEvent::Progress
                | MediaEvent::CanPlay
                | MediaEvent::CanPlayThrough
        )
    }
}

/// The local audio-decoding/playback primitive.
///
/// Exactly one component may own mutation of a handle (source, position,
/// playback state); everything else observes through the telemetry getters
/// and the event channel.
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Assign a new source URL. Resets position, buffered ranges, and any
    /// previous error.
    async fn set_source(&self, url: &str) -> Result<()>;

    /// Total stream duration, once metadata has loaded. `None` (or a zero
    /// value) means the duration is not yet known.
    async fn duration(&self) -> Option<Duration>;

    /// Currently buffered spans, ordered by start time.
    async fn buffered(&self) -> Vec<BufferedRange>;

    async fn ready_state(&self) -> ReadyState;

    async fn position(&self) -> Duration;

    async fn is_playing(&self) -> bool;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek(&self, position: Duration) -> Result<()>;

    /// Volume as unity gain, `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// The most recent unrecovered error, if any.
    async fn last_error(&self) -> Option<MediaErrorKind>;

    /// Subscribe to handle events. Every call returns an independent
    /// receiver; slow receivers observe lag, not backpressure.
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;
}
