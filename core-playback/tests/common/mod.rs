//! Scripted fakes shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::media::{BufferedRange, MediaErrorKind, MediaEvent, MediaHandle, ReadyState};
use bridge_traits::renderer::{
    CapabilityClass, MediaDescriptor, RendererTransport, SessionNotification, TransportStatus,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// FakeMediaHandle
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    SetSource(String),
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
    SetMuted(bool),
}

#[derive(Debug)]
struct MediaInner {
    source: Option<String>,
    duration: Option<Duration>,
    buffered: Vec<BufferedRange>,
    ready_state: ReadyState,
    position: Duration,
    playing: bool,
    last_error: Option<MediaErrorKind>,
    calls: Vec<MediaCall>,
}

/// Scripted media handle whose telemetry the test mutates directly.
pub struct FakeMediaHandle {
    inner: Mutex<MediaInner>,
    events: broadcast::Sender<MediaEvent>,
}

impl FakeMediaHandle {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(128);
        Arc::new(Self {
            inner: Mutex::new(MediaInner {
                source: None,
                duration: None,
                buffered: Vec::new(),
                ready_state: ReadyState::HaveNothing,
                position: Duration::ZERO,
                playing: false,
                last_error: None,
                calls: Vec::new(),
            }),
            events,
        })
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        self.inner.lock().duration = duration;
    }

    /// Buffered ranges in whole seconds.
    pub fn set_buffered_secs(&self, ranges: &[(u64, u64)]) {
        self.inner.lock().buffered = ranges
            .iter()
            .map(|&(start, end)| {
                BufferedRange::new(Duration::from_secs(start), Duration::from_secs(end))
            })
            .collect();
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        self.inner.lock().ready_state = state;
    }

    pub fn set_position(&self, position: Duration) {
        self.inner.lock().position = position;
    }

    /// Simulate an externally-triggered pause (OS media keys).
    pub fn external_pause(&self) {
        self.inner.lock().playing = false;
        let _ = self.events.send(MediaEvent::Paused);
    }

    pub fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }

    pub fn playing_now(&self) -> bool {
        self.inner.lock().playing
    }

    pub fn current_source(&self) -> Option<String> {
        self.inner.lock().source.clone()
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.inner.lock().calls.clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MediaCall::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MediaHandle for FakeMediaHandle {
    async fn set_source(&self, url: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.source = Some(url.to_string());
        inner.position = Duration::ZERO;
        inner.playing = false;
        inner.last_error = None;
        inner.calls.push(MediaCall::SetSource(url.to_string()));
        Ok(())
    }

    async fn duration(&self) -> Option<Duration> {
        self.inner.lock().duration
    }

    async fn buffered(&self) -> Vec<BufferedRange> {
        self.inner.lock().buffered.clone()
    }

    async fn ready_state(&self) -> ReadyState {
        self.inner.lock().ready_state
    }

    async fn position(&self) -> Duration {
        self.inner.lock().position
    }

    async fn is_playing(&self) -> bool {
        self.inner.lock().playing
    }

    async fn play(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.playing = true;
            inner.calls.push(MediaCall::Play);
        }
        let _ = self.events.send(MediaEvent::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.playing = false;
            inner.calls.push(MediaCall::Pause);
        }
        let _ = self.events.send(MediaEvent::Paused);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.position = position;
        inner.calls.push(MediaCall::Seek(position));
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        self.inner.lock().calls.push(MediaCall::SetVolume(volume));
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.inner.lock().calls.push(MediaCall::SetMuted(muted));
        Ok(())
    }

    async fn last_error(&self) -> Option<MediaErrorKind> {
        self.inner.lock().last_error
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// FakeTransport
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Success,
    Declined,
    Unreachable,
}

#[derive(Debug)]
struct TransportInner {
    connect_behavior: ConnectBehavior,
    connect_delay: Duration,
    session_alive: bool,
    reacquire_ok: bool,
    seek_updates_status: bool,
    status: TransportStatus,
    loads: Vec<MediaDescriptor>,
    seeks: Vec<Duration>,
    plays: u32,
    pauses: u32,
    stops: u32,
    volume_calls: Vec<&'static str>,
    volume_support: (bool, bool, bool),
}

/// Scripted renderer transport with call recording.
pub struct FakeTransport {
    class: CapabilityClass,
    inner: Mutex<TransportInner>,
    notifications: broadcast::Sender<SessionNotification>,
}

impl FakeTransport {
    pub fn new(class: CapabilityClass) -> Arc<Self> {
        let (notifications, _) = broadcast::channel(16);
        Arc::new(Self {
            class,
            inner: Mutex::new(TransportInner {
                connect_behavior: ConnectBehavior::Success,
                connect_delay: Duration::ZERO,
                session_alive: false,
                reacquire_ok: true,
                seek_updates_status: true,
                status: TransportStatus::default(),
                loads: Vec::new(),
                seeks: Vec::new(),
                plays: 0,
                pauses: 0,
                stops: 0,
                volume_calls: Vec::new(),
                volume_support: (true, true, true),
            }),
            notifications,
        })
    }

    pub fn set_connect(&self, behavior: ConnectBehavior, delay: Duration) {
        let mut inner = self.inner.lock();
        inner.connect_behavior = behavior;
        inner.connect_delay = delay;
    }

    /// Which of (direct level, volume object, session request) succeed.
    pub fn set_volume_support(&self, direct: bool, attributes: bool, session: bool) {
        self.inner.lock().volume_support = (direct, attributes, session);
    }

    pub fn set_status(&self, status: TransportStatus) {
        self.inner.lock().status = status;
    }

    pub fn set_reported_position(&self, position: Duration) {
        self.inner.lock().status.position = position;
    }

    pub fn set_reported_volume(&self, volume: u8) {
        self.inner.lock().status.volume = volume;
    }

    pub fn session_alive(&self) -> bool {
        self.inner.lock().session_alive
    }

    /// Force a transport-side session without going through connect.
    pub fn force_session_alive(&self, alive: bool) {
        self.inner.lock().session_alive = alive;
    }

    pub fn end_session(&self, device_id: &str) {
        self.inner.lock().session_alive = false;
        let _ = self
            .notifications
            .send(SessionNotification::SessionEnded {
                device_id: device_id.to_string(),
            });
    }

    pub fn loads(&self) -> Vec<MediaDescriptor> {
        self.inner.lock().loads.clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.inner.lock().seeks.clone()
    }

    pub fn plays(&self) -> u32 {
        self.inner.lock().plays
    }

    pub fn stops(&self) -> u32 {
        self.inner.lock().stops
    }

    pub fn volume_calls(&self) -> Vec<&'static str> {
        self.inner.lock().volume_calls.clone()
    }

    pub fn reported_playing(&self) -> bool {
        self.inner.lock().status.playing
    }
}

#[async_trait]
impl RendererTransport for FakeTransport {
    fn class(&self) -> CapabilityClass {
        self.class
    }

    async fn connect(&self) -> Result<bool> {
        let (behavior, delay) = {
            let inner = self.inner.lock();
            (inner.connect_behavior, inner.connect_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match behavior {
            ConnectBehavior::Success => {
                self.inner.lock().session_alive = true;
                Ok(true)
            }
            ConnectBehavior::Declined => Ok(false),
            ConnectBehavior::Unreachable => {
                Err(BridgeError::OperationFailed("device unreachable".into()))
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.lock().session_alive = false;
        Ok(())
    }

    async fn has_session(&self) -> bool {
        self.inner.lock().session_alive
    }

    async fn reacquire(&self) -> Result<bool> {
        let inner = self.inner.lock();
        Ok(inner.session_alive && inner.reacquire_ok)
    }

    async fn load(&self, media: MediaDescriptor) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.session_alive {
            return Err(BridgeError::OperationFailed("no session".into()));
        }
        inner.status.position = media.start;
        inner.loads.push(media);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.session_alive {
            return Err(BridgeError::OperationFailed("no session".into()));
        }
        inner.plays += 1;
        inner.status.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.pauses += 1;
        inner.status.playing = false;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.stops += 1;
        inner.status.playing = false;
        Ok(())
    }

    async fn seek(&self, position: Duration, resume: bool) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.seeks.push(position);
        if inner.seek_updates_status {
            inner.status.position = position;
            if resume {
                inner.status.playing = true;
            }
        }
        Ok(())
    }

    async fn set_volume_level(&self, level: u8) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.volume_calls.push("direct");
        if inner.volume_support.0 {
            inner.status.volume = level;
            Ok(())
        } else {
            Err(BridgeError::NotAvailable("no direct level setter".into()))
        }
    }

    async fn set_volume_attributes(&self, level: u8) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.volume_calls.push("attributes");
        if inner.volume_support.1 {
            inner.status.volume = level;
            Ok(())
        } else {
            Err(BridgeError::NotAvailable("no volume object".into()))
        }
    }

    async fn request_session_volume(&self, level: u8) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.volume_calls.push("session");
        if inner.volume_support.2 {
            inner.status.volume = level;
            Ok(())
        } else {
            Err(BridgeError::NotAvailable("no session volume".into()))
        }
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.inner.lock().status.muted = muted;
        Ok(())
    }

    async fn fetch_status(&self) -> Result<TransportStatus> {
        let inner = self.inner.lock();
        if !inner.session_alive {
            return Err(BridgeError::OperationFailed("session gone".into()));
        }
        Ok(inner.status.clone())
    }

    fn notifications(&self) -> broadcast::Receiver<SessionNotification> {
        self.notifications.subscribe()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Poll `predicate` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
