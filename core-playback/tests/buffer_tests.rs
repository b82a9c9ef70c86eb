//! Buffer readiness monitor tests against a scripted media handle.

mod common;

use bridge_traits::media::{MediaEvent, ReadyState};
use common::FakeMediaHandle;
use core_playback::buffer::{BufferMonitor, BufferOutcome};
use core_playback::config::BufferPolicy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast_policy() -> BufferPolicy {
    BufferPolicy {
        poll_interval: Duration::from_millis(10),
        hard_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn have_enough_data_short_circuits_to_ready() {
    let media = FakeMediaHandle::new();
    media.set_ready_state(ReadyState::HaveEnoughData);

    let monitor = BufferMonitor::new(fast_policy());
    let outcome = monitor
        .wait_for_sufficient_buffer(media.as_ref(), Duration::ZERO, CancellationToken::new())
        .await;

    assert_eq!(outcome, BufferOutcome::Ready);
}

#[tokio::test]
async fn small_files_wait_for_near_complete_buffering() {
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::from_secs(120)));
    media.set_ready_state(ReadyState::HaveFutureData);
    media.set_buffered_secs(&[(0, 100)]);

    // 120s at 128 kbit/s is under 2 MB: a small file. The byte floor is
    // lowered so it is met from the start; the completeness gate must still
    // hold out for 95% of the duration.
    let policy = BufferPolicy {
        assumed_bitrate_kbps: 128,
        min_buffered_bytes: 1024 * 1024,
        poll_interval: Duration::from_millis(10),
        hard_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let monitor = BufferMonitor::new(policy);

    let waiter = media.clone();
    let handle = tokio::spawn(async move {
        monitor
            .wait_for_sufficient_buffer(waiter.as_ref(), Duration::ZERO, CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!handle.is_finished(), "83% buffered must not be ready");

    media.set_buffered_secs(&[(0, 115)]); // 95.8%
    media.emit(MediaEvent::Progress);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, BufferOutcome::Ready);
}

#[tokio::test]
async fn large_files_gate_on_byte_floor_and_lookahead() {
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::from_secs(200)));
    media.set_ready_state(ReadyState::HaveFutureData);
    media.set_buffered_secs(&[(0, 40)]); // ~5 MB at 1024 kbit/s: below floor

    let monitor = BufferMonitor::new(fast_policy());
    let waiter = media.clone();
    let handle = tokio::spawn(async move {
        monitor
            .wait_for_sufficient_buffer(waiter.as_ref(), Duration::ZERO, CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!handle.is_finished(), "below the byte floor must not be ready");

    media.set_buffered_secs(&[(0, 90)]); // ~11.5 MB, covers offset + 30s
    media.emit(MediaEvent::Progress);

    assert_eq!(handle.await.unwrap(), BufferOutcome::Ready);
}

#[tokio::test]
async fn two_hundred_second_track_is_not_a_small_file() {
    // Declared duration was unknown; the handle reports 200s once metadata
    // arrives. At the assumed bitrate that estimates past the small-file
    // threshold, so 45% buffered with lookahead coverage is already ready
    // under the large-file policy.
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::from_secs(200)));
    media.set_ready_state(ReadyState::HaveFutureData);
    media.set_buffered_secs(&[(0, 90)]);

    let monitor = BufferMonitor::new(fast_policy());
    let outcome = monitor
        .wait_for_sufficient_buffer(media.as_ref(), Duration::ZERO, CancellationToken::new())
        .await;

    assert_eq!(outcome, BufferOutcome::Ready);
}

#[tokio::test]
async fn zero_reported_duration_uses_the_large_file_policy() {
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::ZERO));
    media.set_ready_state(ReadyState::HaveFutureData);
    media.set_buffered_secs(&[(0, 90)]);

    let monitor = BufferMonitor::new(fast_policy());
    let outcome = monitor
        .wait_for_sufficient_buffer(media.as_ref(), Duration::ZERO, CancellationToken::new())
        .await;

    assert_eq!(outcome, BufferOutcome::Ready);
}

#[tokio::test]
async fn buffered_range_must_cover_the_start_offset() {
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::from_secs(600)));
    media.set_ready_state(ReadyState::HaveFutureData);
    // Plenty of bytes, but nothing around the requested offset.
    media.set_buffered_secs(&[(0, 90)]);

    let monitor = BufferMonitor::new(fast_policy());
    let waiter = media.clone();
    let offset = Duration::from_secs(120);
    let handle = tokio::spawn(async move {
        monitor
            .wait_for_sufficient_buffer(waiter.as_ref(), offset, CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(
        !handle.is_finished(),
        "an uncovered start offset must not be ready"
    );

    media.set_buffered_secs(&[(0, 90), (110, 160)]); // covers 120..150+
    media.emit(MediaEvent::Progress);

    assert_eq!(handle.await.unwrap(), BufferOutcome::Ready);
}

#[tokio::test]
async fn hard_timeout_resolves_instead_of_failing() {
    let media = FakeMediaHandle::new();
    media.set_duration(Some(Duration::from_secs(600)));
    media.set_ready_state(ReadyState::HaveMetadata);

    let policy = BufferPolicy {
        poll_interval: Duration::from_millis(20),
        hard_timeout: Duration::from_millis(150),
        ..Default::default()
    };
    let monitor = BufferMonitor::new(policy);

    let started = std::time::Instant::now();
    let outcome = monitor
        .wait_for_sufficient_buffer(media.as_ref(), Duration::ZERO, CancellationToken::new())
        .await;

    assert_eq!(outcome, BufferOutcome::TimedOut);
    assert!(outcome.should_proceed());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn poll_budget_resolves_instead_of_spinning() {
    let media = FakeMediaHandle::new();
    media.set_ready_state(ReadyState::HaveNothing);

    let policy = BufferPolicy {
        poll_interval: Duration::from_millis(10),
        hard_timeout: Duration::from_secs(30),
        max_polls: 3,
        ..Default::default()
    };
    let monitor = BufferMonitor::new(policy);

    let outcome = monitor
        .wait_for_sufficient_buffer(media.as_ref(), Duration::ZERO, CancellationToken::new())
        .await;

    assert_eq!(outcome, BufferOutcome::PollBudget);
    assert!(outcome.should_proceed());
}

#[tokio::test]
async fn cancellation_aborts_the_wait() {
    let media = FakeMediaHandle::new();
    media.set_ready_state(ReadyState::HaveMetadata);

    let monitor = BufferMonitor::new(fast_policy());
    let token = CancellationToken::new();
    let waiter = media.clone();
    let wait_token = token.clone();
    let handle = tokio::spawn(async move {
        monitor
            .wait_for_sufficient_buffer(waiter.as_ref(), Duration::ZERO, wait_token)
            .await
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    token.cancel();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, BufferOutcome::Cancelled);
    assert!(!outcome.should_proceed());
}

#[tokio::test]
async fn handle_events_trigger_rechecks_between_polls() {
    let media = FakeMediaHandle::new();
    media.set_ready_state(ReadyState::HaveMetadata);

    // Polls are far apart; only the event channel can wake the monitor in
    // time.
    let policy = BufferPolicy {
        poll_interval: Duration::from_secs(10),
        hard_timeout: Duration::from_secs(60),
        ..Default::default()
    };
    let monitor = BufferMonitor::new(policy);

    let waiter = media.clone();
    let handle = tokio::spawn(async move {
        monitor
            .wait_for_sufficient_buffer(waiter.as_ref(), Duration::ZERO, CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    media.set_ready_state(ReadyState::HaveEnoughData);
    media.emit(MediaEvent::CanPlayThrough);

    let outcome = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("event should have woken the monitor")
        .unwrap();
    assert_eq!(outcome, BufferOutcome::Ready);
}
