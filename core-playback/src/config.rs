//! # Playback Configuration
//!
//! Policy constants for buffering and session control. The buffering
//! thresholds and the assumed bitrate started life as empirically tuned
//! heuristics; they are kept as configurable policy rather than fixed
//! semantics so deployments can recalibrate them against real content.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffer readiness policy.
///
/// The underlying transport serves capped-size ranges, so total file size is
/// never known up front; it is estimated from duration times an assumed
/// bitrate. Small files favor completeness over latency; large files gate on
/// an absolute byte floor plus lookahead coverage around the start offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferPolicy {
    /// Assumed average bitrate used to estimate sizes, in kbit/s.
    #[serde(default = "default_assumed_bitrate_kbps")]
    pub assumed_bitrate_kbps: u32,

    /// Estimated sizes at or below this are "small files".
    ///
    /// Default: 20 MiB.
    #[serde(default = "default_small_file_threshold_bytes")]
    pub small_file_threshold_bytes: u64,

    /// Fraction of the duration that must be buffered before a small file is
    /// ready.
    ///
    /// Default: 0.95.
    #[serde(default = "default_small_file_fraction")]
    pub small_file_fraction: f64,

    /// Minimum absolute buffered quantity before a large file is ready.
    ///
    /// Default: 10 MiB.
    #[serde(default = "default_min_buffered_bytes")]
    pub min_buffered_bytes: u64,

    /// How far past the start offset a buffered range must reach, unless it
    /// already reaches end of file.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_lookahead")]
    pub lookahead: Duration,

    /// Cadence of the belt-and-suspenders readiness poll. Handles loading
    /// range-limited, cross-origin sources fire buffering events
    /// inconsistently, so events alone cannot be trusted.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Fail-safe: resolve (as "proceed anyway") after this long.
    ///
    /// Default: 120 seconds.
    #[serde(default = "default_hard_timeout")]
    pub hard_timeout: Duration,

    /// Fail-safe: resolve after this many readiness re-checks.
    ///
    /// Default: 240.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            assumed_bitrate_kbps: default_assumed_bitrate_kbps(),
            small_file_threshold_bytes: default_small_file_threshold_bytes(),
            small_file_fraction: default_small_file_fraction(),
            min_buffered_bytes: default_min_buffered_bytes(),
            lookahead: default_lookahead(),
            poll_interval: default_poll_interval(),
            hard_timeout: default_hard_timeout(),
            max_polls: default_max_polls(),
        }
    }
}

impl BufferPolicy {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.assumed_bitrate_kbps == 0 {
            return Err("assumed_bitrate_kbps must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.small_file_fraction) {
            return Err("small_file_fraction must be between 0.0 and 1.0".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be > 0".to_string());
        }
        if self.hard_timeout < self.poll_interval {
            return Err("hard_timeout cannot be shorter than poll_interval".to_string());
        }
        if self.max_polls == 0 {
            return Err("max_polls must be > 0".to_string());
        }
        Ok(())
    }

    /// Bytes per second implied by the assumed bitrate.
    fn bytes_per_second(&self) -> f64 {
        f64::from(self.assumed_bitrate_kbps) * 1000.0 / 8.0
    }

    /// Estimated total file size for a stream of the given duration.
    pub fn estimated_size_bytes(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.bytes_per_second()) as u64
    }

    /// Estimated byte quantity represented by a buffered span.
    pub fn bytes_for(&self, span: Duration) -> u64 {
        (span.as_secs_f64() * self.bytes_per_second()) as u64
    }

    /// Whether a stream of the given duration falls under the small-file
    /// policy. Unknown durations never do.
    pub fn is_small_file(&self, duration: Option<Duration>) -> bool {
        duration.map_or(false, |total| {
            self.estimated_size_bytes(total) <= self.small_file_threshold_bytes
        })
    }
}

/// Controller-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Buffer readiness policy.
    #[serde(default)]
    pub buffer: BufferPolicy,

    /// How long the busy guard stays held after a seek/load/transport
    /// command, suppressing reconciliation of stale telemetry.
    ///
    /// Default: 3 seconds.
    #[serde(default = "default_busy_hold")]
    pub busy_hold: Duration,

    /// Pause between issuing a remote load and the follow-up play command,
    /// letting the renderer fill its own buffer.
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_renderer_ready_delay")]
    pub renderer_ready_delay: Duration,

    /// Cadence of output status polling (local and remote).
    ///
    /// Default: 1 second.
    #[serde(default = "default_status_poll_interval")]
    pub status_poll_interval: Duration,

    /// Capacity of the process-wide discovered-duration cache.
    ///
    /// Default: 256 tracks.
    #[serde(default = "default_duration_cache_capacity")]
    pub duration_cache_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer: BufferPolicy::default(),
            busy_hold: default_busy_hold(),
            renderer_ready_delay: default_renderer_ready_delay(),
            status_poll_interval: default_status_poll_interval(),
            duration_cache_capacity: default_duration_cache_capacity(),
        }
    }
}

impl PlayerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.buffer.validate()?;
        if self.status_poll_interval.is_zero() {
            return Err("status_poll_interval must be > 0".to_string());
        }
        if self.duration_cache_capacity == 0 {
            return Err("duration_cache_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_assumed_bitrate_kbps() -> u32 {
    1024
}

fn default_small_file_threshold_bytes() -> u64 {
    20 * 1024 * 1024 // 20 MiB
}

fn default_small_file_fraction() -> f64 {
    0.95
}

fn default_min_buffered_bytes() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

fn default_lookahead() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_hard_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_polls() -> u32 {
    240
}

fn default_busy_hold() -> Duration {
    Duration::from_secs(3)
}

fn default_renderer_ready_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_status_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_duration_cache_capacity() -> usize {
    256
}
