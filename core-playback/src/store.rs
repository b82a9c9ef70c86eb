//! Process-local player state.
//!
//! Best-effort, non-durable storage for the handful of values that survive
//! across tracks within one process: resume offsets, discovered durations,
//! the last track and output device, and the repeat mode. Absence always
//! degrades gracefully (start from zero, no repeat, local output).

use crate::intent::RepeatMode;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

struct StoreInner {
    resume_offsets: HashMap<String, Duration>,
    durations: LruCache<String, Duration>,
    last_track_id: Option<String>,
    last_device_id: Option<String>,
    repeat: RepeatMode,
}

/// Shared process-local store, keyed by opaque string ids.
pub struct PlayerStore {
    inner: Mutex<StoreInner>,
}

impl PlayerStore {
    pub fn new(duration_cache_capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(duration_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(StoreInner {
                resume_offsets: HashMap::new(),
                durations: LruCache::new(capacity),
                last_track_id: None,
                last_device_id: None,
                repeat: RepeatMode::Off,
            }),
        }
    }

    /// Saved resume offset for a track; zero when none was recorded.
    pub fn resume_offset(&self, track_id: &str) -> Duration {
        self.inner
            .lock()
            .resume_offsets
            .get(track_id)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Merge an observed position into the saved resume offset.
    ///
    /// The stored value never decreases: rapid pause/resume cycles must not
    /// regress to an earlier offset. Returns the value now stored.
    pub fn merge_resume_offset(&self, track_id: &str, observed: Duration) -> Duration {
        let mut inner = self.inner.lock();
        let entry = inner
            .resume_offsets
            .entry(track_id.to_string())
            .or_insert(Duration::ZERO);
        if observed > *entry {
            *entry = observed;
        }
        *entry
    }

    /// Forget the resume offset for a track (explicit stop or completion).
    pub fn clear_resume_offset(&self, track_id: &str) {
        self.inner.lock().resume_offsets.remove(track_id);
    }

    /// Lazily discovered duration for a track, if one was observed.
    pub fn cached_duration(&self, track_id: &str) -> Option<Duration> {
        self.inner.lock().durations.get(track_id).copied()
    }

    /// Record an observed duration. Zero durations are not cached.
    pub fn cache_duration(&self, track_id: &str, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.inner
            .lock()
            .durations
            .put(track_id.to_string(), duration);
    }

    pub fn last_track_id(&self) -> Option<String> {
        self.inner.lock().last_track_id.clone()
    }

    pub fn set_last_track(&self, track_id: &str) {
        self.inner.lock().last_track_id = Some(track_id.to_string());
    }

    pub fn last_device_id(&self) -> Option<String> {
        self.inner.lock().last_device_id.clone()
    }

    /// Record the selected output device; `None` means local output.
    pub fn set_last_device(&self, device_id: Option<String>) {
        self.inner.lock().last_device_id = device_id;
    }

    pub fn repeat(&self) -> RepeatMode {
        self.inner.lock().repeat
    }

    pub fn set_repeat(&self, mode: RepeatMode) {
        self.inner.lock().repeat = mode;
    }
}
