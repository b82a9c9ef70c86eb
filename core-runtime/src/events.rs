//! # Event Bus System
//!
//! Provides an event-driven architecture for the playback engine using
//! `tokio::sync::broadcast`. Modules publish typed events; the UI layer and
//! tests subscribe independently.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │  Controller  ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │Output Adapter├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │Buffer Monitor├──────────────>│           ├─────────────────>│ Subscriber │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlayerEvent, PlaybackEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! let event = PlayerEvent::Playback(PlaybackEvent::Started {
//!     track_id: "track-1".to_string(),
//!     title: "Song".to_string(),
//! });
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, so subscribers can observe two
//! errors: `RecvError::Lagged(n)` when they fell behind by `n` events
//! (non-fatal; keep receiving) and `RecvError::Closed` when every sender is
//! gone (treat as shutdown). Publishing with no subscribers returns an
//! error; callers publish with `.ok()` since delivery is best-effort.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum PlayerEvent {
    /// Playback session lifecycle events
    Playback(PlaybackEvent),
    /// Remote output / device events
    Output(OutputEvent),
    /// Buffer readiness events
    Buffer(BufferEvent),
    /// User-visible notices (soft, dismissible)
    Notice(NoticeEvent),
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::Playback(e) => e.description(),
            PlayerEvent::Output(e) => e.description(),
            PlayerEvent::Buffer(e) => e.description(),
            PlayerEvent::Notice(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            PlayerEvent::Notice(_) => EventSeverity::Warning,
            PlayerEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            PlayerEvent::Output(OutputEvent::Connected { .. }) => EventSeverity::Info,
            PlayerEvent::Output(OutputEvent::Disconnected { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback started for a newly loaded track.
    Started { track_id: String, title: String },
    /// Playback paused.
    Paused { track_id: String, position_ms: u64 },
    /// Playback resumed after pause.
    Resumed { track_id: String, position_ms: u64 },
    /// Playback stopped and the session cleared.
    Stopped { track_id: String },
    /// Track finished playing naturally.
    Completed { track_id: String },
    /// A seek was requested.
    SeekRequested { track_id: String, position_ms: u64 },
    /// Playback error occurred.
    Error {
        track_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::SeekRequested { .. } => "Seek requested",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Output Events
// ============================================================================

/// Events related to remote output devices and sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum OutputEvent {
    /// A remote device became visible to a discovery plugin.
    DeviceDiscovered { device_id: String, name: String },
    /// Connection to a device is in progress.
    Connecting { device_id: String },
    /// A session was established.
    Connected { device_id: String, name: String },
    /// The user dismissed the device picker; not an error.
    ConnectDeclined { device_id: String },
    /// The session was torn down locally.
    Disconnected { device_id: String },
    /// The session ended from the renderer side.
    SessionLost { device_id: String },
}

impl OutputEvent {
    fn description(&self) -> &str {
        match self {
            OutputEvent::DeviceDiscovered { .. } => "Remote device discovered",
            OutputEvent::Connecting { .. } => "Connecting to remote device",
            OutputEvent::Connected { .. } => "Remote device connected",
            OutputEvent::ConnectDeclined { .. } => "Device picker dismissed",
            OutputEvent::Disconnected { .. } => "Remote device disconnected",
            OutputEvent::SessionLost { .. } => "Remote session lost",
        }
    }
}

// ============================================================================
// Buffer Events
// ============================================================================

/// Events emitted by the buffer readiness monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BufferEvent {
    /// A readiness wait began for a load or seek.
    WaitStarted {
        track_id: String,
        start_offset_ms: u64,
    },
    /// Enough data is buffered; playback may start.
    Ready { track_id: String, waited_ms: u64 },
    /// The fail-safe timeout elapsed; playback proceeds anyway.
    TimedOut { track_id: String },
}

impl BufferEvent {
    fn description(&self) -> &str {
        match self {
            BufferEvent::WaitStarted { .. } => "Buffering",
            BufferEvent::Ready { .. } => "Buffer ready",
            BufferEvent::TimedOut { .. } => "Buffer wait timed out",
        }
    }
}

// ============================================================================
// Notice Events
// ============================================================================

/// Classified media fault shown to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaFaultKind {
    /// The stream rejected the request; sign-in is required.
    NotAuthenticated,
    /// Transient network failure or timeout.
    Network,
    /// The format cannot be decoded on this device.
    UnsupportedFormat,
}

/// User-visible, dismissible notices. Never modal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NoticeEvent {
    /// A remote device was unreachable or the session could not start.
    ConnectionFailed { device_name: String },
    /// The stream credential is stale; the user must reconnect the account.
    ReconnectRequired,
    /// The local media handle reported a fault.
    MediaFault {
        kind: MediaFaultKind,
        track_id: String,
    },
}

impl NoticeEvent {
    fn description(&self) -> &str {
        match self {
            NoticeEvent::ConnectionFailed { .. } => "Could not connect to device",
            NoticeEvent::ReconnectRequired => "Reconnect required",
            NoticeEvent::MediaFault { .. } => "Playback problem",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned per subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it will
    /// receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter; only matching events are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, or `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn started(track: &str) -> PlayerEvent {
        PlayerEvent::Playback(PlaybackEvent::Started {
            track_id: track.to_string(),
            title: "Test Track".to_string(),
        })
    }

    #[tokio::test]
    async fn event_bus_subscription_counting() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn emission_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("t-1")).is_err());
    }

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = started("t-1");
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn stream_filter_skips_non_matching_events() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, PlayerEvent::Notice(_)));

        bus.emit(started("t-1")).ok();

        let notice = PlayerEvent::Notice(NoticeEvent::ReconnectRequired);
        bus.emit(notice.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), notice);
    }

    #[tokio::test]
    async fn lagged_subscriber_is_reported() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&format!("t-{i}"))).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn severity_classification() {
        let error = PlayerEvent::Playback(PlaybackEvent::Error {
            track_id: None,
            message: "boom".to_string(),
            recoverable: false,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let notice = PlayerEvent::Notice(NoticeEvent::ReconnectRequired);
        assert_eq!(notice.severity(), EventSeverity::Warning);

        let buffer = PlayerEvent::Buffer(BufferEvent::WaitStarted {
            track_id: "t-1".to_string(),
            start_offset_ms: 0,
        });
        assert_eq!(buffer.severity(), EventSeverity::Debug);
    }

    #[test]
    fn events_serialize_round_trip() {
        let event = PlayerEvent::Notice(NoticeEvent::MediaFault {
            kind: MediaFaultKind::UnsupportedFormat,
            track_id: "t-9".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("t-9"));
        let back: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn try_recv_empty_returns_none() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }
}
