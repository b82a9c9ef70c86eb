//! # Position/State Reconciler
//!
//! Produces the single displayed "now playing" view from two independently
//! updating telemetry sources, without oscillation. Authority rules:
//!
//! | Field | Remote output active | Local output active |
//! |---|---|---|
//! | position, duration | remote status channel, except while the busy guard is held | local handle telemetry |
//! | playing flag | controller intent, reconciled one-directionally by the controller | same |
//! | volume, muted | user input only, synced user → remote once at connect | user input, applied to the handle |
//!
//! Volume never flows back from telemetry: polling a renderer's self-reported
//! volume while the user drags a slider causes visible jitter. The clock
//! update path here simply has no volume input, so the rule is structural.

use crate::intent::PlayerState;
use bridge_traits::queue::Track;
use core_output::{BusyGuard, OutputKind};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Reactive view model consumed by the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Option<Track>,
    pub state: PlayerState,
    pub is_playing: bool,
    /// A load or seek pipeline is running.
    pub is_loading: bool,
    /// The buffer readiness monitor is waiting.
    pub is_buffering: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    /// User-facing volume, `0..=100`.
    pub volume: u8,
    pub muted: bool,
    pub output_name: String,
}

impl NowPlaying {
    fn initial(output_name: String) -> Self {
        Self {
            track: None,
            state: PlayerState::Stopped,
            is_playing: false,
            is_loading: false,
            is_buffering: false,
            position: Duration::ZERO,
            duration: None,
            volume: 100,
            muted: false,
            output_name,
        }
    }
}

/// Merges controller intent and output telemetry into the published
/// [`NowPlaying`] snapshot.
pub struct Reconciler {
    busy: Arc<BusyGuard>,
    output_kind: Mutex<OutputKind>,
    tx: watch::Sender<NowPlaying>,
}

impl Reconciler {
    pub fn new(busy: Arc<BusyGuard>, output_name: String) -> Self {
        let (tx, _) = watch::channel(NowPlaying::initial(output_name));
        Self {
            busy,
            output_kind: Mutex::new(OutputKind::Local),
            tx,
        }
    }

    /// Subscribe to view model updates.
    pub fn subscribe(&self) -> watch::Receiver<NowPlaying> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> NowPlaying {
        self.tx.borrow().clone()
    }

    fn update(&self, apply: impl FnOnce(&mut NowPlaying)) {
        let mut current = self.tx.borrow().clone();
        apply(&mut current);
        self.tx.send_replace(current);
    }

    /// Reset the view for a new (or cleared) track.
    pub fn set_track(&self, track: Option<Track>, duration_hint: Option<Duration>) {
        self.update(|now| {
            now.track = track;
            now.position = Duration::ZERO;
            now.duration = duration_hint.filter(|d| !d.is_zero());
        });
    }

    pub fn set_state(&self, state: PlayerState) {
        self.update(|now| {
            now.state = state;
            now.is_loading = state.is_loading();
        });
    }

    pub fn set_playing(&self, playing: bool) {
        self.update(|now| now.is_playing = playing);
    }

    pub fn set_buffering(&self, buffering: bool) {
        self.update(|now| now.is_buffering = buffering);
    }

    /// Immediate position update for responsiveness (seek feedback). Applies
    /// regardless of the busy guard.
    pub fn set_optimistic_position(&self, position: Duration) {
        self.update(|now| now.position = position);
    }

    /// Merge a telemetry clock reading. Suppressed entirely while the busy
    /// guard is held, so an in-flight seek/load's optimistic state survives
    /// stale reports.
    pub fn apply_clock(&self, position: Duration, duration: Option<Duration>) {
        if self.busy.is_active() {
            return;
        }
        self.update(|now| {
            now.position = position;
            if let Some(total) = duration.filter(|d| !d.is_zero()) {
                now.duration = Some(total);
            }
        });
    }

    /// Record the active output. Telemetry authority follows the output.
    pub fn set_output(&self, kind: OutputKind, name: String) {
        *self.output_kind.lock() = kind;
        self.update(|now| now.output_name = name);
    }

    pub fn output_kind(&self) -> OutputKind {
        *self.output_kind.lock()
    }

    /// User volume input. The only writer of the displayed volume.
    pub fn set_user_volume(&self, level: u8) {
        self.update(|now| now.volume = level.min(100));
    }

    pub fn set_user_muted(&self, muted: bool) {
        self.update(|now| now.muted = muted);
    }

    pub fn user_volume(&self) -> u8 {
        self.tx.borrow().volume
    }

    pub fn user_muted(&self) -> bool {
        self.tx.borrow().muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        Reconciler::new(Arc::new(BusyGuard::new()), "This device".to_string())
    }

    #[test]
    fn initial_snapshot_is_stopped() {
        let reconciler = reconciler();
        let now = reconciler.snapshot();
        assert_eq!(now.state, PlayerState::Stopped);
        assert!(!now.is_playing);
        assert_eq!(now.volume, 100);
        assert_eq!(now.output_name, "This device");
    }

    #[test]
    fn clock_updates_apply_when_not_busy() {
        let reconciler = reconciler();
        reconciler.apply_clock(Duration::from_secs(42), Some(Duration::from_secs(300)));
        let now = reconciler.snapshot();
        assert_eq!(now.position, Duration::from_secs(42));
        assert_eq!(now.duration, Some(Duration::from_secs(300)));
    }

    #[test]
    fn busy_guard_suppresses_clock_updates() {
        let busy = Arc::new(BusyGuard::new());
        let reconciler = Reconciler::new(Arc::clone(&busy), "Speaker".to_string());

        reconciler.set_optimistic_position(Duration::from_secs(120));
        busy.hold_for(Duration::from_secs(60));

        // A stale report from before the seek must not snap the UI back.
        reconciler.apply_clock(Duration::from_secs(30), Some(Duration::from_secs(300)));
        assert_eq!(reconciler.snapshot().position, Duration::from_secs(120));

        busy.release();
        reconciler.apply_clock(Duration::from_secs(121), None);
        assert_eq!(reconciler.snapshot().position, Duration::from_secs(121));
    }

    #[test]
    fn optimistic_position_bypasses_busy_guard() {
        let busy = Arc::new(BusyGuard::new());
        let reconciler = Reconciler::new(Arc::clone(&busy), "Speaker".to_string());
        busy.hold_for(Duration::from_secs(60));
        reconciler.set_optimistic_position(Duration::from_secs(90));
        assert_eq!(reconciler.snapshot().position, Duration::from_secs(90));
    }

    #[test]
    fn clock_never_writes_volume() {
        let reconciler = reconciler();
        reconciler.set_user_volume(40);
        // Telemetry carries no volume input at all; repeated clock merges
        // leave the user value untouched.
        for _ in 0..5 {
            reconciler.apply_clock(Duration::from_secs(10), None);
        }
        assert_eq!(reconciler.snapshot().volume, 40);
    }

    #[test]
    fn zero_duration_reports_are_ignored() {
        let reconciler = reconciler();
        reconciler.apply_clock(Duration::from_secs(5), Some(Duration::from_secs(200)));
        reconciler.apply_clock(Duration::from_secs(6), Some(Duration::ZERO));
        assert_eq!(reconciler.snapshot().duration, Some(Duration::from_secs(200)));
    }

    #[test]
    fn new_track_resets_clock() {
        let reconciler = reconciler();
        reconciler.apply_clock(Duration::from_secs(50), Some(Duration::from_secs(100)));
        reconciler.set_track(None, None);
        let now = reconciler.snapshot();
        assert_eq!(now.position, Duration::ZERO);
        assert!(now.duration.is_none());
    }
}
