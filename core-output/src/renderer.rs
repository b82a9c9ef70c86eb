//! Profile-driven adapter over a black-box renderer transport.
//!
//! One `RendererOutput` type serves every remote class. Per-class quirks
//! (volume mechanism order, seek support, advertised content type) live in a
//! [`RendererProfile`] resolved at construction, so no call site ever probes
//! the transport for capabilities.

use crate::adapter::{LoadRequest, OpsSupport, OutputAdapter, OutputConfig, OutputKind, RemoteStatus};
use crate::busy::BusyGuard;
use crate::session::{RemoteClock, RemoteSession};
use crate::volume::{self, VolumeStrategy};
use async_trait::async_trait;
use bridge_traits::renderer::{
    CapabilityClass, DeviceDescriptor, MediaDescriptor, RendererTransport, SessionNotification,
};
use core_runtime::events::{EventBus, NoticeEvent, OutputEvent, PlayerEvent, RecvError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Data-driven description of one renderer class's quirks.
#[derive(Debug, Clone)]
pub struct RendererProfile {
    pub class: CapabilityClass,
    /// Volume mechanisms in the order they are attempted.
    pub volume_order: Vec<VolumeStrategy>,
    pub supports_seek: bool,
    pub supports_mute: bool,
    /// Content type advertised in media descriptors when the caller does not
    /// supply one.
    pub content_type: String,
}

impl RendererProfile {
    pub fn cast() -> Self {
        Self {
            class: CapabilityClass::Cast,
            volume_order: vec![
                VolumeStrategy::DirectLevel,
                VolumeStrategy::VolumeObject,
                VolumeStrategy::SessionRequest,
            ],
            supports_seek: true,
            supports_mute: true,
            content_type: "audio/mpeg".to_string(),
        }
    }

    pub fn airplay() -> Self {
        Self {
            class: CapabilityClass::AirPlay,
            volume_order: vec![VolumeStrategy::VolumeObject, VolumeStrategy::DirectLevel],
            supports_seek: true,
            supports_mute: true,
            content_type: "audio/mpeg".to_string(),
        }
    }

    pub fn upnp() -> Self {
        Self {
            class: CapabilityClass::Upnp,
            volume_order: vec![VolumeStrategy::DirectLevel, VolumeStrategy::SessionRequest],
            supports_seek: true,
            supports_mute: true,
            content_type: "audio/mpeg".to_string(),
        }
    }

    /// Bluetooth sinks only route audio; transport control stays local.
    pub fn bluetooth() -> Self {
        Self {
            class: CapabilityClass::Bluetooth,
            volume_order: vec![VolumeStrategy::DirectLevel],
            supports_seek: false,
            supports_mute: false,
            content_type: "audio/mpeg".to_string(),
        }
    }

    pub fn for_class(class: CapabilityClass) -> Self {
        match class {
            CapabilityClass::Cast => Self::cast(),
            CapabilityClass::AirPlay => Self::airplay(),
            CapabilityClass::Upnp => Self::upnp(),
            CapabilityClass::Bluetooth => Self::bluetooth(),
        }
    }

    /// The typed supported-operations declaration derived from this profile.
    pub fn ops(&self) -> OpsSupport {
        OpsSupport {
            seek: self.supports_seek,
            volume: !self.volume_order.is_empty(),
            mute: self.supports_mute,
        }
    }
}

/// Output adapter for one remote device.
///
/// Owns the [`RemoteSession`] record exclusively. Transport failures never
/// escape as errors: operations report `false` and user-relevant failures
/// additionally surface as notice events.
pub struct RendererOutput {
    device: DeviceDescriptor,
    profile: RendererProfile,
    ops: OpsSupport,
    transport: Arc<dyn RendererTransport>,
    config: OutputConfig,
    bus: EventBus,
    busy: Arc<BusyGuard>,
    session: Arc<RwLock<Option<RemoteSession>>>,
    status_tx: Arc<watch::Sender<RemoteStatus>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl RendererOutput {
    /// Build an adapter for `device` using the default profile of its
    /// capability class.
    ///
    /// Must be called from within a tokio runtime: the adapter spawns a
    /// listener for transport session notifications.
    pub fn new(
        device: DeviceDescriptor,
        transport: Arc<dyn RendererTransport>,
        config: OutputConfig,
        bus: EventBus,
    ) -> Arc<Self> {
        let profile = RendererProfile::for_class(device.class);
        Self::with_profile(device, transport, profile, config, bus)
    }

    /// Build an adapter with an explicit profile.
    pub fn with_profile(
        device: DeviceDescriptor,
        transport: Arc<dyn RendererTransport>,
        profile: RendererProfile,
        config: OutputConfig,
        bus: EventBus,
    ) -> Arc<Self> {
        let ops = profile.ops();
        let (status_tx, _) = watch::channel(RemoteStatus {
            device_name: device.name.clone(),
            ..Default::default()
        });

        let adapter = Arc::new(Self {
            device,
            profile,
            ops,
            transport,
            config,
            bus,
            busy: Arc::new(BusyGuard::new()),
            session: Arc::new(RwLock::new(None)),
            status_tx: Arc::new(status_tx),
            poller: Mutex::new(None),
        });
        adapter.spawn_notification_listener();
        adapter
    }

    /// The busy guard held across this adapter's seek/load operations.
    pub fn busy_guard(&self) -> Arc<BusyGuard> {
        Arc::clone(&self.busy)
    }

    /// Snapshot of the current session record, if any.
    pub async fn session(&self) -> Option<RemoteSession> {
        self.session.read().await.clone()
    }

    fn spawn_notification_listener(&self) {
        let mut notifications = self.transport.notifications();
        let session = Arc::clone(&self.session);
        let bus = self.bus.clone();
        let device_id = self.device.id.clone();

        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(SessionNotification::SessionEnded { device_id: ended })
                        if ended == device_id =>
                    {
                        // Renderer-side teardown: drop the session, do not retry.
                        if session.write().await.take().is_some() {
                            debug!(device = %device_id, "renderer ended the session");
                            bus.emit(PlayerEvent::Output(OutputEvent::SessionLost {
                                device_id: device_id.clone(),
                            }))
                            .ok();
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    fn start_poller(&self) {
        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let status_tx = Arc::clone(&self.status_tx);
        let busy = Arc::clone(&self.busy);
        let bus = self.bus.clone();
        let device = self.device.clone();
        let poll_interval = self.config.status_poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if session.read().await.is_none() {
                    break;
                }
                match transport.fetch_status().await {
                    Ok(raw) => {
                        let mut merged = status_tx.borrow().clone();
                        // Time fields stay frozen while a seek/load is in
                        // flight so the UI cannot snap back to a stale
                        // position.
                        if !busy.is_active() {
                            merged.position = raw.position;
                            merged.duration = raw.duration;
                        }
                        merged.playing = raw.playing;
                        merged.volume = raw.volume;
                        merged.muted = raw.muted;
                        if let Some(name) = raw.device_name {
                            merged.device_name = name;
                        }

                        if let Some(active) = session.write().await.as_mut() {
                            active.clock = RemoteClock {
                                position: merged.position,
                                duration: merged.duration,
                                playing: merged.playing,
                                volume: merged.volume,
                                muted: merged.muted,
                            };
                        }
                        status_tx.send_replace(merged);
                    }
                    Err(err) => {
                        // A dead status channel means the session is gone.
                        warn!(device = %device.id, error = %err, "status poll failed, dropping session");
                        if session.write().await.take().is_some() {
                            bus.emit(PlayerEvent::Output(OutputEvent::SessionLost {
                                device_id: device.id.clone(),
                            }))
                            .ok();
                        }
                        break;
                    }
                }
            }
        });

        if let Some(previous) = self.poller.lock().replace(handle) {
            previous.abort();
        }
    }

    fn stop_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }

    /// Make sure a connected session exists, re-acquiring a lost handle from
    /// a still-alive transport session before giving up.
    async fn ensure_session(&self) -> bool {
        if self
            .session
            .read()
            .await
            .as_ref()
            .map_or(false, RemoteSession::is_connected)
        {
            return true;
        }

        if self.transport.has_session().await {
            match self.transport.reacquire().await {
                Ok(true) => {
                    *self.session.write().await =
                        Some(RemoteSession::connected(self.device.clone()));
                    self.start_poller();
                    return true;
                }
                Ok(false) => {}
                Err(err) => {
                    debug!(device = %self.device.id, error = %err, "session re-acquisition failed");
                }
            }
        }
        false
    }
}

#[async_trait]
impl OutputAdapter for RendererOutput {
    fn kind(&self) -> OutputKind {
        OutputKind::from(self.profile.class)
    }

    fn supported_ops(&self) -> OpsSupport {
        self.ops
    }

    fn device_name(&self) -> String {
        self.device.name.clone()
    }

    fn device_id(&self) -> Option<String> {
        Some(self.device.id.clone())
    }

    async fn is_connected(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .map_or(false, RemoteSession::is_connected)
    }

    async fn connect(&self) -> bool {
        if self.is_connected().await && self.transport.has_session().await {
            return true;
        }

        self.bus
            .emit(PlayerEvent::Output(OutputEvent::Connecting {
                device_id: self.device.id.clone(),
            }))
            .ok();
        *self.session.write().await = Some(RemoteSession::connecting(self.device.clone()));

        match self.transport.connect().await {
            Ok(true) => {
                *self.session.write().await = Some(RemoteSession::connected(self.device.clone()));
                self.start_poller();
                self.bus
                    .emit(PlayerEvent::Output(OutputEvent::Connected {
                        device_id: self.device.id.clone(),
                        name: self.device.name.clone(),
                    }))
                    .ok();
                true
            }
            Ok(false) => {
                *self.session.write().await = None;
                // Explicit cancellation: no notice beyond the event.
                self.bus
                    .emit(PlayerEvent::Output(OutputEvent::ConnectDeclined {
                        device_id: self.device.id.clone(),
                    }))
                    .ok();
                false
            }
            Err(err) if err.is_declined() => {
                *self.session.write().await = None;
                self.bus
                    .emit(PlayerEvent::Output(OutputEvent::ConnectDeclined {
                        device_id: self.device.id.clone(),
                    }))
                    .ok();
                false
            }
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "connect failed");
                *self.session.write().await = None;
                self.bus
                    .emit(PlayerEvent::Notice(NoticeEvent::ConnectionFailed {
                        device_name: self.device.name.clone(),
                    }))
                    .ok();
                false
            }
        }
    }

    async fn disconnect(&self) {
        let had_session = self.session.write().await.take().is_some();
        self.stop_poller();

        if had_session || self.transport.has_session().await {
            // Stop in-flight media before releasing the session handle.
            if let Err(err) = self.transport.stop().await {
                debug!(device = %self.device.id, error = %err, "stop during disconnect failed");
            }
            if let Err(err) = self.transport.disconnect().await {
                debug!(device = %self.device.id, error = %err, "disconnect failed");
            }
            self.bus
                .emit(PlayerEvent::Output(OutputEvent::Disconnected {
                    device_id: self.device.id.clone(),
                }))
                .ok();
        }
        self.busy.release();
    }

    async fn load_media(&self, request: LoadRequest) -> bool {
        if !self.ensure_session().await && !self.connect().await {
            return false;
        }

        let start = request.start;
        let media = MediaDescriptor {
            url: request.url,
            title: request.title,
            content_type: if request.content_type.is_empty() {
                self.profile.content_type.clone()
            } else {
                request.content_type
            },
            start,
        };

        self.busy.hold_for(self.config.busy_hold);
        match self.transport.load(media).await {
            Ok(()) => {
                // Keep the guard held past completion; the renderer reports
                // stale positions while it spins up.
                self.busy.hold_for(self.config.busy_hold);
                let mut status = self.status_tx.borrow().clone();
                status.position = start;
                self.status_tx.send_replace(status);
                true
            }
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "load failed");
                false
            }
        }
    }

    async fn play(&self) -> bool {
        if !self.ensure_session().await {
            return false;
        }
        match self.transport.play().await {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "play failed");
                false
            }
        }
    }

    async fn pause(&self) -> bool {
        if !self.ensure_session().await {
            return false;
        }
        match self.transport.pause().await {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "pause failed");
                false
            }
        }
    }

    async fn stop(&self) -> bool {
        if !self.ensure_session().await {
            return false;
        }
        match self.transport.stop().await {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "stop failed");
                false
            }
        }
    }

    async fn seek(&self, position: Duration) -> bool {
        if !self.ops.seek {
            return false;
        }
        if !self.ensure_session().await {
            return false;
        }

        self.busy.hold_for(self.config.busy_hold);
        match self.transport.seek(position, true).await {
            Ok(()) => {
                self.busy.hold_for(self.config.busy_hold);
                let mut status = self.status_tx.borrow().clone();
                status.position = position;
                self.status_tx.send_replace(status);
                true
            }
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "seek failed");
                false
            }
        }
    }

    async fn set_volume(&self, level: u8) -> bool {
        if !self.ops.volume {
            return false;
        }
        if !self.ensure_session().await {
            return false;
        }
        volume::apply_first(&self.profile.volume_order, self.transport.as_ref(), level.min(100))
            .await
    }

    async fn set_muted(&self, muted: bool) -> bool {
        if !self.ops.mute {
            return false;
        }
        if !self.ensure_session().await {
            return false;
        }
        match self.transport.set_muted(muted).await {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.device.id, error = %err, "mute failed");
                false
            }
        }
    }

    fn status(&self) -> watch::Receiver<RemoteStatus> {
        self.status_tx.subscribe()
    }
}
