//! # Playback Session Controller
//!
//! Orchestrates a single logical "now playing" session. Owns the
//! authoritative play/pause/seek intent, selects which output adapter is
//! active, and mediates between local buffering and the active adapter.
//!
//! ## Load pipeline
//!
//! Every external trigger (track selected, seek requested, output changed)
//! enters through one designated method and funnels into an explicit staged
//! sequence:
//!
//! ```text
//! Buffering -> Connecting -> Loading -> AwaitingRendererReady -> Playing
//! ```
//!
//! Each stage checks the load generation before advancing, so a superseded
//! attempt resolves as a no-op instead of stomping on its successor. The
//! local media handle buffers through every stage even when a remote
//! renderer is the active output: switching back to local playback must not
//! require a fresh download.

use crate::buffer::{BufferMonitor, BufferOutcome};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::intent::{PlaybackIntent, PlayerState, RepeatMode};
use crate::reconcile::{NowPlaying, Reconciler};
use crate::store::PlayerStore;
use bridge_traits::auth::{CredentialAttachment, CredentialSource};
use bridge_traits::media::{MediaErrorKind, MediaEvent, MediaHandle};
use bridge_traits::queue::{QueueSource, Track};
use core_output::{
    BusyGuard, LoadRequest, LocalOutput, OutputAdapter, OutputConfig, RemoteStatus,
};
use core_runtime::events::{
    BufferEvent, EventBus, MediaFaultKind, NoticeEvent, PlaybackEvent, PlayerEvent, RecvError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Owns the playback session and the local media handle.
///
/// All mutations of the media handle flow through this type so the
/// pause-before-switch invariant stays enforceable. Construct with
/// [`PlayerController::new`] inside a tokio runtime.
pub struct PlayerController {
    media: Arc<dyn MediaHandle>,
    queue_source: Arc<dyn QueueSource>,
    credentials: Arc<dyn CredentialSource>,
    store: Arc<PlayerStore>,
    bus: EventBus,
    config: PlayerConfig,
    monitor: BufferMonitor,
    busy: Arc<BusyGuard>,
    reconciler: Reconciler,
    local_output: Arc<LocalOutput>,
    active: RwLock<Arc<dyn OutputAdapter>>,
    queue: RwLock<Vec<Track>>,
    intent: Mutex<PlaybackIntent>,
    state: Mutex<PlayerState>,
    load_generation: AtomicU64,
    load_cancel: Mutex<CancellationToken>,
    output_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl PlayerController {
    pub fn new(
        media: Arc<dyn MediaHandle>,
        queue_source: Arc<dyn QueueSource>,
        credentials: Arc<dyn CredentialSource>,
        bus: EventBus,
        store: Arc<PlayerStore>,
        config: PlayerConfig,
    ) -> Arc<Self> {
        let busy = Arc::new(BusyGuard::new());
        let output_config = OutputConfig {
            status_poll_interval: config.status_poll_interval,
            busy_hold: config.busy_hold,
        };
        let local_output = LocalOutput::new(Arc::clone(&media), output_config);
        let reconciler = Reconciler::new(Arc::clone(&busy), local_output.device_name());
        let monitor = BufferMonitor::new(config.buffer.clone());

        let controller = Arc::new(Self {
            media,
            queue_source,
            credentials,
            store,
            bus,
            config,
            monitor,
            busy,
            reconciler,
            active: RwLock::new(Arc::clone(&local_output) as Arc<dyn OutputAdapter>),
            local_output,
            queue: RwLock::new(Vec::new()),
            intent: Mutex::new(PlaybackIntent::default()),
            state: Mutex::new(PlayerState::Stopped),
            load_generation: AtomicU64::new(0),
            load_cancel: Mutex::new(CancellationToken::new()),
            output_generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        });

        controller.intent.lock().repeat = controller.store.repeat();
        controller.spawn_media_listener();
        controller.attach_status_forwarder(
            Arc::clone(&controller.local_output) as Arc<dyn OutputAdapter>,
            0,
        );
        controller
    }

    // ========================================================================
    // Public surface
    // ========================================================================

    /// Reactive view model for the UI layer.
    pub fn now_playing(&self) -> watch::Receiver<NowPlaying> {
        self.reconciler.subscribe()
    }

    pub fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.intent.lock().track.clone()
    }

    pub fn repeat(&self) -> RepeatMode {
        self.intent.lock().repeat
    }

    pub fn set_repeat(&self, mode: RepeatMode) {
        self.intent.lock().repeat = mode;
        self.store.set_repeat(mode);
    }

    /// Stop background listeners. Called once when the player is torn down.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.load_cancel.lock().cancel();
    }

    /// Re-fetch the ordered track list from the queue supplier.
    pub async fn refresh_queue(&self) -> Result<usize> {
        let tracks = self.queue_source.tracks().await?;
        let count = tracks.len();
        *self.queue.write().await = tracks;
        debug!(count, "queue refreshed");
        Ok(count)
    }

    pub async fn queue(&self) -> Vec<Track> {
        self.queue.read().await.clone()
    }

    /// Entry point: track selected.
    #[instrument(skip(self))]
    pub async fn select_track(self: &Arc<Self>, track_id: &str) {
        let track = {
            let queue = self.queue.read().await;
            queue.iter().find(|track| track.id == track_id).cloned()
        };
        let Some(track) = track else {
            warn!(track = %track_id, "selected track is not in the queue");
            return;
        };
        let resume = self.store.resume_offset(&track.id);
        self.begin_track(track, resume, true).await;
    }

    /// Toggle between playing and paused.
    pub async fn play_pause(self: &Arc<Self>) {
        let (track, playing) = {
            let intent = self.intent.lock();
            (intent.track.clone(), intent.playing)
        };
        let Some(track) = track else {
            return;
        };
        let adapter = self.active_adapter().await;

        if playing {
            // The resume offset takes the max of the two known clocks so
            // rapid pause/resume cycles never regress to an earlier offset.
            let local = self.media.position().await;
            let remote = if adapter.kind().is_remote() {
                adapter.status().borrow().position
            } else {
                Duration::ZERO
            };
            let persisted = self
                .store
                .merge_resume_offset(&track.id, local.max(remote));

            self.busy.hold_for(self.config.busy_hold);
            let _ = adapter.pause().await;
            self.intent.lock().playing = false;
            self.reconciler.set_playing(false);
            self.set_state(PlayerState::Paused);
            self.bus
                .emit(PlayerEvent::Playback(PlaybackEvent::Paused {
                    track_id: track.id.clone(),
                    position_ms: persisted.as_millis() as u64,
                }))
                .ok();
        } else {
            self.busy.hold_for(self.config.busy_hold);
            if adapter.play().await {
                self.intent.lock().playing = true;
                self.reconciler.set_playing(true);
                self.set_state(PlayerState::Playing);
                let position_ms = self.reconciler.snapshot().position.as_millis() as u64;
                self.bus
                    .emit(PlayerEvent::Playback(PlaybackEvent::Resumed {
                        track_id: track.id.clone(),
                        position_ms,
                    }))
                    .ok();
            }
        }
    }

    /// Entry point: seek requested.
    ///
    /// The displayed position updates immediately; the busy guard keeps
    /// stale telemetry from snapping it back while the seek is in flight.
    #[instrument(skip(self))]
    pub async fn seek(self: &Arc<Self>, position: Duration) {
        let (track, play) = {
            let intent = self.intent.lock();
            (intent.track.clone(), intent.playing)
        };
        let Some(track) = track else {
            return;
        };

        self.bus
            .emit(PlayerEvent::Playback(PlaybackEvent::SeekRequested {
                track_id: track.id.clone(),
                position_ms: position.as_millis() as u64,
            }))
            .ok();

        self.busy.hold_for(self.config.busy_hold);
        self.reconciler.set_optimistic_position(position);
        self.set_state(PlayerState::Seeking);

        let adapter = self.active_adapter().await;
        let (generation, cancel) = self.supersede_load();

        if adapter.kind().is_remote() {
            // Remote renderers need a fresh load-from-offset rather than an
            // in-place seek on the buffered stream.
            let url = match self.resolve_stream_url(&track).await {
                Ok(url) => url,
                Err(err) => {
                    self.fail_load(&track, err);
                    return;
                }
            };
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.run_load_pipeline(track, url, position, play, generation, cancel)
                    .await;
            });
        } else {
            if let Err(err) = self.media.seek(position).await {
                debug!(error = %err, "local seek rejected by handle");
            }
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let outcome = this
                    .monitor
                    .wait_for_sufficient_buffer(this.media.as_ref(), position, cancel)
                    .await;
                if !outcome.should_proceed() || !this.load_is_current(generation) {
                    return;
                }
                this.busy.hold_for(this.config.busy_hold);
                if play && this.intent.lock().playing {
                    if this.active_adapter().await.play().await {
                        this.reconciler.set_playing(true);
                        this.set_state(PlayerState::Playing);
                    }
                } else {
                    this.set_state(PlayerState::Paused);
                }
            });
        }
    }

    pub async fn next(self: &Arc<Self>) {
        self.advance(1).await;
    }

    pub async fn previous(self: &Arc<Self>) {
        self.advance(-1).await;
    }

    /// Stop playback and clear the session.
    pub async fn stop(self: &Arc<Self>) {
        let _ = self.supersede_load();
        let track = {
            let mut intent = self.intent.lock();
            intent.playing = false;
            intent.track.take()
        };

        let adapter = self.active_adapter().await;
        if adapter.kind().is_remote() {
            let _ = adapter.stop().await;
        }
        let _ = self.media.pause().await;
        let _ = self.media.seek(Duration::ZERO).await;

        if let Some(track) = track {
            // Explicit stop invalidates the saved resume offset.
            self.store.clear_resume_offset(&track.id);
            self.bus
                .emit(PlayerEvent::Playback(PlaybackEvent::Stopped {
                    track_id: track.id,
                }))
                .ok();
        }

        self.reconciler.set_track(None, None);
        self.reconciler.set_playing(false);
        self.reconciler.set_buffering(false);
        self.set_state(PlayerState::Stopped);
    }

    /// User volume input, `0..=100`. The displayed value follows the user,
    /// never the renderer's self-reported level.
    pub async fn set_volume(self: &Arc<Self>, level: u8) {
        let level = level.min(100);
        self.reconciler.set_user_volume(level);
        if !self.active_adapter().await.set_volume(level).await {
            debug!(level, "active output did not accept volume change");
        }
    }

    pub async fn set_muted(self: &Arc<Self>, muted: bool) {
        self.reconciler.set_user_muted(muted);
        if !self.active_adapter().await.set_muted(muted).await {
            debug!(muted, "active output did not accept mute change");
        }
    }

    /// Entry point: output changed. `None` selects local playback.
    ///
    /// Ordering is load-bearing: the local element is paused and rewound
    /// before the previous remote session is torn down and before the new
    /// target connects, so two outputs never render the same track at once.
    /// Boxed wrapper around [`Self::set_active_output`]. Returning a named
    /// `Pin<Box<dyn Future + Send>>` breaks the auto-trait inference cycle
    /// that otherwise arises when the spawned task recurses back into
    /// `set_active_output`; it does not change behavior.
    fn set_active_output_boxed<'a>(
        self: &'a Arc<Self>,
        target: Option<Arc<dyn OutputAdapter>>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(self.set_active_output(target))
    }

    #[instrument(skip_all)]
    pub async fn set_active_output(self: &Arc<Self>, target: Option<Arc<dyn OutputAdapter>>) {
        let generation = self.output_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let adapter = target
            .unwrap_or_else(|| Arc::clone(&self.local_output) as Arc<dyn OutputAdapter>);

        // Freeze the displayed clock across the switch.
        let resume_position = self.reconciler.snapshot().position;
        self.busy.hold_for(self.config.busy_hold);

        // Quiesce local rendering first.
        let _ = self.media.pause().await;
        let _ = self.media.seek(Duration::ZERO).await;

        let previous = {
            let mut active = self.active.write().await;
            std::mem::replace(&mut *active, Arc::clone(&adapter))
        };
        if previous.kind().is_remote() {
            previous.disconnect().await;
        }

        self.reconciler
            .set_output(adapter.kind(), adapter.device_name());
        self.store.set_last_device(adapter.device_id());
        self.attach_status_forwarder(Arc::clone(&adapter), generation);

        let (track, play) = {
            let intent = self.intent.lock();
            (intent.track.clone(), intent.playing)
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if adapter.kind().is_remote() {
                let connected = adapter.connect().await;
                if !this.output_is_current(generation) {
                    // A newer switch won while we were connecting; this
                    // session must not survive.
                    if connected {
                        adapter.disconnect().await;
                    }
                    return;
                }
                if !connected {
                    // Routed through a boxed helper to break the
                    // recursive-async `Send` inference cycle (this method
                    // awaits itself through the spawned task). Behavior is
                    // unchanged.
                    this.set_active_output_boxed(None).await;
                    return;
                }
                // One-time user -> remote volume sync at connection. After
                // this point volume only ever flows from user input.
                adapter.set_volume(this.reconciler.user_volume()).await;
                adapter.set_muted(this.reconciler.user_muted()).await;
            }

            let Some(track) = track else {
                return;
            };
            let (load_generation, cancel) = this.supersede_load();
            let url = match this.resolve_stream_url(&track).await {
                Ok(url) => url,
                Err(err) => {
                    this.fail_load(&track, err);
                    return;
                }
            };
            if let Err(err) = this.media.set_source(&url).await {
                this.fail_load(&track, PlaybackError::SourceError(err.to_string()));
                return;
            }
            this.reconciler.set_optimistic_position(resume_position);
            this.set_state(PlayerState::Loading);
            this.run_load_pipeline(track, url, resume_position, play, load_generation, cancel)
                .await;
        });
    }

    // ========================================================================
    // Load pipeline
    // ========================================================================

    async fn begin_track(self: &Arc<Self>, track: Track, start_offset: Duration, play: bool) {
        let (generation, cancel) = self.supersede_load();
        self.busy.hold_for(self.config.busy_hold);

        {
            let mut intent = self.intent.lock();
            intent.track = Some(track.clone());
            intent.playing = play;
        }
        let duration_hint = self.store.cached_duration(&track.id).or(track.duration);
        self.reconciler.set_track(Some(track.clone()), duration_hint);
        self.reconciler.set_optimistic_position(start_offset);
        self.reconciler.set_playing(play);
        self.set_state(PlayerState::Loading);

        let url = match self.resolve_stream_url(&track).await {
            Ok(url) => url,
            Err(err) => {
                self.fail_load(&track, err);
                return;
            }
        };

        // The local element always (re)loads and buffers the source, even
        // when a remote output is active.
        if let Err(err) = self.media.set_source(&url).await {
            self.fail_load(&track, PlaybackError::SourceError(err.to_string()));
            return;
        }

        self.store.set_last_track(&track.id);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_load_pipeline(track, url, start_offset, play, generation, cancel)
                .await;
        });
    }

    #[instrument(skip_all, fields(track = %track.id, offset_secs = start_offset.as_secs()))]
    async fn run_load_pipeline(
        self: Arc<Self>,
        track: Track,
        url: String,
        start_offset: Duration,
        play: bool,
        generation: u64,
        cancel: CancellationToken,
    ) {
        // Stage: Buffering.
        self.reconciler.set_buffering(true);
        self.bus
            .emit(PlayerEvent::Buffer(BufferEvent::WaitStarted {
                track_id: track.id.clone(),
                start_offset_ms: start_offset.as_millis() as u64,
            }))
            .ok();
        let wait_started = Instant::now();
        let outcome = self
            .monitor
            .wait_for_sufficient_buffer(self.media.as_ref(), start_offset, cancel.clone())
            .await;
        self.reconciler.set_buffering(false);

        if !self.load_is_current(generation) {
            debug!("superseded during buffering");
            return;
        }
        match outcome {
            BufferOutcome::Cancelled => return,
            BufferOutcome::Ready => {
                self.bus
                    .emit(PlayerEvent::Buffer(BufferEvent::Ready {
                        track_id: track.id.clone(),
                        waited_ms: wait_started.elapsed().as_millis() as u64,
                    }))
                    .ok();
            }
            BufferOutcome::TimedOut | BufferOutcome::PollBudget => {
                // Best effort: proceed and let the handle stall/resume.
                self.bus
                    .emit(PlayerEvent::Buffer(BufferEvent::TimedOut {
                        track_id: track.id.clone(),
                    }))
                    .ok();
            }
        }

        let adapter = self.active_adapter().await;
        if adapter.kind().is_remote() {
            // Stage: Connecting.
            if !adapter.is_connected().await && !adapter.connect().await {
                self.fail_load(&track, PlaybackError::OutputUnavailable(adapter.device_name()));
                return;
            }
            if !self.load_is_current(generation) {
                return;
            }

            // Stage: Loading. The renderer fetches the same credentialed URL
            // the local element buffers from.
            let request = LoadRequest {
                url,
                title: track.title.clone(),
                content_type: String::new(),
                start: start_offset,
            };
            if !adapter.load_media(request).await {
                self.fail_load(&track, PlaybackError::OutputUnavailable(adapter.device_name()));
                return;
            }
            if !self.load_is_current(generation) {
                return;
            }

            // Stage: AwaitingRendererReady. Give the renderer a moment to
            // fill its own buffer before the play command.
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.renderer_ready_delay) => {}
            }
            if !self.load_is_current(generation) {
                return;
            }
        } else if !start_offset.is_zero() {
            // Local playback: position the handle; readiness was gated above.
            if let Err(err) = self.media.seek(start_offset).await {
                debug!(error = %err, "post-buffer seek rejected by handle");
            }
        }

        // Stage: Playing.
        self.busy.hold_for(self.config.busy_hold);
        let should_play = play && self.intent.lock().playing;
        if should_play {
            if !adapter.play().await {
                self.fail_load(&track, PlaybackError::OutputUnavailable(adapter.device_name()));
                return;
            }
            self.reconciler.set_playing(true);
            self.set_state(PlayerState::Playing);
            self.bus
                .emit(PlayerEvent::Playback(PlaybackEvent::Started {
                    track_id: track.id.clone(),
                    title: track.title.clone(),
                }))
                .ok();
        } else {
            self.reconciler.set_playing(false);
            self.set_state(PlayerState::Paused);
        }
        info!("load pipeline complete");
    }

    fn fail_load(&self, track: &Track, err: PlaybackError) {
        warn!(track = %track.id, error = %err, "load failed");
        if err.is_credential() {
            self.bus
                .emit(PlayerEvent::Notice(NoticeEvent::ReconnectRequired))
                .ok();
        }
        self.bus
            .emit(PlayerEvent::Playback(PlaybackEvent::Error {
                track_id: Some(track.id.clone()),
                message: err.to_string(),
                recoverable: err.is_transient(),
            }))
            .ok();
        self.intent.lock().playing = false;
        self.reconciler.set_playing(false);
        self.reconciler.set_buffering(false);
        self.set_state(PlayerState::Stopped);
    }

    // ========================================================================
    // Telemetry handling
    // ========================================================================

    fn spawn_media_listener(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut events = self.media.subscribe();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => event,
                };
                let Some(this) = weak.upgrade() else { break };
                match event {
                    Ok(MediaEvent::Ended) => {
                        // Authoritative only while the local handle renders;
                        // a remote renderer's end is detected from status.
                        if !this.active_adapter().await.kind().is_remote() {
                            this.on_track_ended().await;
                        }
                    }
                    Ok(MediaEvent::Playing) => this.on_local_transport_flag(true).await,
                    Ok(MediaEvent::Paused) => this.on_local_transport_flag(false).await,
                    Ok(MediaEvent::Error(kind)) => this.on_media_error(kind).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "media event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    fn attach_status_forwarder(self: &Arc<Self>, adapter: Arc<dyn OutputAdapter>, generation: u64) {
        let weak = Arc::downgrade(self);
        let mut status = adapter.status();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let Some(this) = weak.upgrade() else { break };
                if !this.output_is_current(generation) {
                    break;
                }
                let snapshot = status.borrow_and_update().clone();
                this.on_output_status(snapshot).await;
            }
        });
    }

    async fn on_output_status(self: &Arc<Self>, status: RemoteStatus) {
        let track = { self.intent.lock().track.clone() };

        // Lazily discovered duration is cached process-wide by track id.
        if let (Some(track), Some(duration)) = (track.as_ref(), status.duration) {
            self.store.cache_duration(&track.id, duration);
        }

        self.reconciler.apply_clock(status.position, status.duration);

        if self.busy.is_active() {
            return;
        }
        if !matches!(self.state(), PlayerState::Playing | PlayerState::Paused) {
            return;
        }
        let Some(track) = track else { return };

        let adapter = self.active_adapter().await;
        let intent_playing = { self.intent.lock().playing };

        // End of media on a remote renderer: it parks paused at the tail.
        if adapter.kind().is_remote() && intent_playing && !status.playing {
            if let Some(duration) = status.duration.filter(|total| !total.is_zero()) {
                if status.position + Duration::from_secs(1) >= duration {
                    self.on_track_ended().await;
                    return;
                }
            }
        }

        // One-directional reconciliation: an externally-triggered transport
        // change (physical remote, OS media keys) updates the intent.
        if status.playing != intent_playing {
            debug!(
                track = %track.id,
                external = status.playing,
                "adopting externally-reported play state"
            );
            self.adopt_external_play_state(status.playing, &track);
        }
    }

    async fn on_local_transport_flag(self: &Arc<Self>, playing: bool) {
        if self.active_adapter().await.kind().is_remote() {
            return;
        }
        if self.busy.is_active() {
            return;
        }
        if !matches!(self.state(), PlayerState::Playing | PlayerState::Paused) {
            return;
        }
        let (track, intent_playing) = {
            let intent = self.intent.lock();
            (intent.track.clone(), intent.playing)
        };
        let Some(track) = track else { return };
        if intent_playing != playing {
            self.adopt_external_play_state(playing, &track);
        }
    }

    fn adopt_external_play_state(&self, playing: bool, track: &Track) {
        self.intent.lock().playing = playing;
        self.reconciler.set_playing(playing);
        self.set_state(if playing {
            PlayerState::Playing
        } else {
            PlayerState::Paused
        });
        let position_ms = self.reconciler.snapshot().position.as_millis() as u64;
        let event = if playing {
            PlaybackEvent::Resumed {
                track_id: track.id.clone(),
                position_ms,
            }
        } else {
            PlaybackEvent::Paused {
                track_id: track.id.clone(),
                position_ms,
            }
        };
        self.bus.emit(PlayerEvent::Playback(event)).ok();
    }

    async fn on_media_error(self: &Arc<Self>, kind: MediaErrorKind) {
        let track = { self.intent.lock().track.clone() };
        let Some(track) = track else { return };

        let fault = match kind {
            MediaErrorKind::NotAuthorized => MediaFaultKind::NotAuthenticated,
            MediaErrorKind::Network => MediaFaultKind::Network,
            MediaErrorKind::Decode | MediaErrorKind::UnsupportedFormat => {
                MediaFaultKind::UnsupportedFormat
            }
        };
        warn!(track = %track.id, ?kind, "media handle fault");
        self.bus
            .emit(PlayerEvent::Notice(NoticeEvent::MediaFault {
                kind: fault,
                track_id: track.id.clone(),
            }))
            .ok();
        self.bus
            .emit(PlayerEvent::Playback(PlaybackEvent::Error {
                track_id: Some(track.id.clone()),
                message: format!("media fault: {kind:?}"),
                recoverable: matches!(kind, MediaErrorKind::Network),
            }))
            .ok();

        let _ = self.supersede_load();
        self.intent.lock().playing = false;
        self.reconciler.set_playing(false);
        self.reconciler.set_buffering(false);
        self.set_state(PlayerState::Stopped);
    }

    async fn on_track_ended(self: &Arc<Self>) {
        let (track, repeat) = {
            let intent = self.intent.lock();
            (intent.track.clone(), intent.repeat)
        };
        let Some(track) = track else { return };

        // A finished track restarts from the top next time.
        self.store.clear_resume_offset(&track.id);
        self.bus
            .emit(PlayerEvent::Playback(PlaybackEvent::Completed {
                track_id: track.id.clone(),
            }))
            .ok();

        match repeat {
            RepeatMode::One => {
                self.begin_track(track, Duration::ZERO, true).await;
            }
            RepeatMode::All | RepeatMode::Off => {
                let queue = self.queue.read().await.clone();
                let index = queue.iter().position(|entry| entry.id == track.id);
                let next_index = match index {
                    Some(i) if i + 1 < queue.len() => Some(i + 1),
                    Some(_) if repeat == RepeatMode::All && !queue.is_empty() => Some(0),
                    _ => None,
                };
                match next_index {
                    Some(i) => {
                        let next = queue[i].clone();
                        self.begin_track(next, Duration::ZERO, true).await;
                    }
                    None => self.stop().await,
                }
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn active_adapter(&self) -> Arc<dyn OutputAdapter> {
        Arc::clone(&*self.active.read().await)
    }

    /// Cancel the in-flight load attempt, if any, and open a new generation.
    fn supersede_load(&self) -> (u64, CancellationToken) {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.load_cancel.lock(), token.clone());
        previous.cancel();
        (generation, token)
    }

    fn load_is_current(&self, generation: u64) -> bool {
        self.load_generation.load(Ordering::SeqCst) == generation
    }

    fn output_is_current(&self, generation: u64) -> bool {
        self.output_generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, state: PlayerState) {
        *self.state.lock() = state;
        self.reconciler.set_state(state);
    }

    async fn advance(self: &Arc<Self>, step: i64) {
        let current_id = { self.intent.lock().track.as_ref().map(|t| t.id.clone()) };
        let queue = self.queue.read().await.clone();
        if queue.is_empty() {
            return;
        }
        let repeat = self.repeat();
        let current_index =
            current_id.and_then(|id| queue.iter().position(|track| track.id == id));

        let target = match current_index {
            Some(index) => {
                let candidate = index as i64 + step;
                if candidate < 0 {
                    Some(if repeat == RepeatMode::All {
                        queue.len() - 1
                    } else {
                        0
                    })
                } else if candidate as usize >= queue.len() {
                    if repeat == RepeatMode::All {
                        Some(0)
                    } else {
                        None
                    }
                } else {
                    Some(candidate as usize)
                }
            }
            None => Some(0),
        };

        match target {
            Some(index) => {
                let track = queue[index].clone();
                self.begin_track(track, Duration::ZERO, true).await;
            }
            None => self.stop().await,
        }
    }

    async fn resolve_stream_url(&self, track: &Track) -> Result<String> {
        match self.credentials.attachment() {
            CredentialAttachment::None => Ok(track.stream_url.clone()),
            CredentialAttachment::Header => {
                // The handle attaches the header itself; still fail fast on a
                // stale credential instead of letting the load 401.
                self.credentials.access_token().await?;
                Ok(track.stream_url.clone())
            }
            CredentialAttachment::QueryParameter => {
                let token = self.credentials.access_token().await?;
                let separator = if track.stream_url.contains('?') { '&' } else { '?' };
                Ok(format!(
                    "{}{}access_token={}",
                    track.stream_url, separator, token
                ))
            }
        }
    }
}
