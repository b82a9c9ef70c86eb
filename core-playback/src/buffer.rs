//! # Buffer Readiness Monitor
//!
//! Decides when enough contiguous data is available around a start offset to
//! begin (or resume) playback without an immediate stall, given that the
//! transport serves data in capped-size ranges rather than one unbounded
//! stream.
//!
//! The wait resolves, it never fails: a resolved wait means "best effort
//! ready", not "guaranteed non-stalling". On timeout or an exhausted poll
//! budget the caller proceeds anyway and lets the handle's own stall/resume
//! behavior take over, which beats blocking indefinitely.

use crate::config::BufferPolicy;
use bridge_traits::media::{BufferedRange, MediaHandle, ReadyState};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Why a readiness wait resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOutcome {
    /// The policy's readiness conditions were met.
    Ready,
    /// The hard timeout elapsed; proceed anyway.
    TimedOut,
    /// The re-check budget was exhausted; proceed anyway.
    PollBudget,
    /// The wait was aborted because a newer load superseded it. The caller
    /// must discard the attempt entirely.
    Cancelled,
}

impl BufferOutcome {
    /// Returns `true` when the caller should continue with playback.
    pub fn should_proceed(&self) -> bool {
        !matches!(self, BufferOutcome::Cancelled)
    }
}

/// Transient record of one readiness wait. Created per load/seek attempt and
/// discarded once the attempt resolves or is superseded.
#[derive(Debug, Clone)]
pub struct BufferState {
    /// Offset playback will start from.
    pub target_offset: Duration,
    /// Total buffered span observed at the last re-check.
    pub buffered_estimate: Duration,
    /// Whether the readiness conditions were met.
    pub ready: bool,
    /// Number of readiness re-checks performed.
    pub polls: u32,
}

impl BufferState {
    fn new(target_offset: Duration) -> Self {
        Self {
            target_offset,
            buffered_estimate: Duration::ZERO,
            ready: false,
            polls: 0,
        }
    }
}

/// Buffer readiness monitor.
#[derive(Debug, Clone)]
pub struct BufferMonitor {
    policy: BufferPolicy,
}

impl BufferMonitor {
    pub fn new(policy: BufferPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BufferPolicy {
        &self.policy
    }

    /// Wait until enough data around `start_offset` is buffered.
    ///
    /// Subscribes to the handle's buffering events and additionally re-checks
    /// on a fixed poll cadence, since events alone are unreliable under
    /// range-limited loading. Resolves with the reason; cancellation via
    /// `cancel` yields [`BufferOutcome::Cancelled`].
    pub async fn wait_for_sufficient_buffer(
        &self,
        handle: &dyn MediaHandle,
        start_offset: Duration,
        cancel: CancellationToken,
    ) -> BufferOutcome {
        let mut state = BufferState::new(start_offset);
        let mut events = handle.subscribe();
        let mut events_open = true;
        let deadline = tokio::time::Instant::now() + self.policy.hard_timeout;
        let mut ticker = tokio::time::interval(self.policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick fires immediately and performs the initial check.
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(offset_secs = start_offset.as_secs(), "buffer wait cancelled");
                    return BufferOutcome::Cancelled;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(
                        offset_secs = start_offset.as_secs(),
                        polls = state.polls,
                        "buffer wait hit hard timeout, proceeding"
                    );
                    return BufferOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
                event = events.recv(), if events_open => {
                    match event {
                        Ok(event) if event.is_buffer_signal() => {}
                        Ok(_) => continue,
                        Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => {
                            events_open = false;
                            continue;
                        }
                    }
                }
            }

            state.polls += 1;
            if self.is_ready(handle, start_offset, &mut state).await {
                state.ready = true;
                debug!(
                    offset_secs = start_offset.as_secs(),
                    buffered_secs = state.buffered_estimate.as_secs(),
                    polls = state.polls,
                    "buffer ready"
                );
                return BufferOutcome::Ready;
            }
            if state.polls >= self.policy.max_polls {
                warn!(polls = state.polls, "buffer re-check budget exhausted, proceeding");
                return BufferOutcome::PollBudget;
            }
        }
    }

    async fn is_ready(
        &self,
        handle: &dyn MediaHandle,
        start_offset: Duration,
        state: &mut BufferState,
    ) -> bool {
        let ready_state = handle.ready_state().await;
        if ready_state == ReadyState::HaveEnoughData {
            return true;
        }

        let duration = handle.duration().await.filter(|total| !total.is_zero());
        let ranges = handle.buffered().await;
        let buffered_total: Duration = ranges.iter().map(BufferedRange::len).sum();
        state.buffered_estimate = buffered_total;

        if self.policy.is_small_file(duration) {
            // Short files favor completeness over latency.
            let total = duration.unwrap_or_default();
            return buffered_total.as_secs_f64()
                >= total.as_secs_f64() * self.policy.small_file_fraction;
        }

        // Large (or unknown-size) files: absolute floor, usable ready-state,
        // and lookahead coverage around the start offset.
        if self.policy.bytes_for(buffered_total) < self.policy.min_buffered_bytes {
            trace!(
                buffered_secs = buffered_total.as_secs(),
                "below minimum buffered byte floor"
            );
            return false;
        }
        if ready_state < ReadyState::HaveFutureData {
            return false;
        }

        let lookahead_target = start_offset + self.policy.lookahead;
        ranges.iter().any(|range| {
            range.contains(start_offset)
                && (range.end >= lookahead_target
                    || duration.map_or(false, |total| range.end >= total))
        })
    }
}
