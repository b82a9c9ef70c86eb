//! Minimal end-to-end wiring of the playback engine against in-memory fakes.
//!
//! Run with: `cargo run -p core-playback --example player_demo`

use async_trait::async_trait;
use bridge_traits::auth::{CredentialAttachment, CredentialSource};
use bridge_traits::error::Result;
use bridge_traits::media::{BufferedRange, MediaErrorKind, MediaEvent, MediaHandle, ReadyState};
use bridge_traits::queue::{QueueSource, Track};
use core_playback::{PlayerConfig, PlayerController, PlayerStore};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// A media handle over a pretend, fully buffered four-minute stream.
struct DemoMedia {
    state: Mutex<(Duration, bool)>,
    events: broadcast::Sender<MediaEvent>,
}

impl DemoMedia {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            state: Mutex::new((Duration::ZERO, false)),
            events,
        })
    }
}

#[async_trait]
impl MediaHandle for DemoMedia {
    async fn set_source(&self, url: &str) -> Result<()> {
        println!("media: source = {url}");
        *self.state.lock() = (Duration::ZERO, false);
        let _ = self.events.send(MediaEvent::LoadedMetadata);
        Ok(())
    }

    async fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(240))
    }

    async fn buffered(&self) -> Vec<BufferedRange> {
        vec![BufferedRange::new(Duration::ZERO, Duration::from_secs(240))]
    }

    async fn ready_state(&self) -> ReadyState {
        ReadyState::HaveEnoughData
    }

    async fn position(&self) -> Duration {
        self.state.lock().0
    }

    async fn is_playing(&self) -> bool {
        self.state.lock().1
    }

    async fn play(&self) -> Result<()> {
        self.state.lock().1 = true;
        let _ = self.events.send(MediaEvent::Playing);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.state.lock().1 = false;
        let _ = self.events.send(MediaEvent::Paused);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        self.state.lock().0 = position;
        Ok(())
    }

    async fn set_volume(&self, _volume: f32) -> Result<()> {
        Ok(())
    }

    async fn set_muted(&self, _muted: bool) -> Result<()> {
        Ok(())
    }

    async fn last_error(&self) -> Option<MediaErrorKind> {
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

struct DemoQueue;

#[async_trait]
impl QueueSource for DemoQueue {
    async fn tracks(&self) -> Result<Vec<Track>> {
        Ok(vec![
            Track {
                id: "demo-1".into(),
                title: "First Demo Track".into(),
                stream_url: "https://proxy.example/stream/demo-1".into(),
                cover_url: None,
                duration: Some(Duration::from_secs(240)),
                folder: "/Demo".into(),
            },
            Track {
                id: "demo-2".into(),
                title: "Second Demo Track".into(),
                stream_url: "https://proxy.example/stream/demo-2".into(),
                cover_url: None,
                duration: None,
                folder: "/Demo".into(),
            },
        ])
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

struct DemoCredentials;

#[async_trait]
impl CredentialSource for DemoCredentials {
    async fn access_token(&self) -> Result<String> {
        Ok("demo-token".into())
    }

    fn attachment(&self) -> CredentialAttachment {
        CredentialAttachment::QueryParameter
    }
}

#[tokio::main]
async fn main() {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )
    .expect("logging init");

    let bus = EventBus::new(64);
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("event: {}", event.description());
        }
    });

    let controller = PlayerController::new(
        DemoMedia::new(),
        Arc::new(DemoQueue),
        Arc::new(DemoCredentials),
        bus,
        Arc::new(PlayerStore::new(64)),
        PlayerConfig::default(),
    );

    let count = controller.refresh_queue().await.expect("queue refresh");
    println!("queue loaded: {count} tracks");

    controller.select_track("demo-1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    controller.seek(Duration::from_secs(30)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    controller.play_pause().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let now = controller.now_playing().borrow().clone();
    println!(
        "now playing: {:?} at {:?} ({:?})",
        now.track.map(|t| t.title),
        now.position,
        now.state
    );

    controller.next().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    let now = controller.now_playing().borrow().clone();
    println!(
        "after next: {:?} ({:?})",
        now.track.map(|t| t.title),
        now.state
    );

    controller.shutdown();
}
