//! Local playback behind the uniform adapter contract.

use crate::adapter::{LoadRequest, OpsSupport, OutputAdapter, OutputConfig, OutputKind, RemoteStatus};
use async_trait::async_trait;
use bridge_traits::media::MediaHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

const LOCAL_DEVICE_NAME: &str = "This device";

/// Adapter variant that renders through the local media handle.
///
/// Always "connected": there is no session to establish or lose. The status
/// channel republishes handle telemetry at the same cadence remote adapters
/// poll at, so consumers read one uniform feed regardless of output.
pub struct LocalOutput {
    media: Arc<dyn MediaHandle>,
    /// Last user-set volume/mute, mirrored into the status feed.
    mix: Arc<Mutex<(u8, bool)>>,
    status_tx: Arc<watch::Sender<RemoteStatus>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl LocalOutput {
    /// Must be called from within a tokio runtime: the telemetry poller
    /// starts immediately.
    pub fn new(media: Arc<dyn MediaHandle>, config: OutputConfig) -> Arc<Self> {
        let (status_tx, _) = watch::channel(RemoteStatus {
            device_name: LOCAL_DEVICE_NAME.to_string(),
            ..Default::default()
        });

        let output = Arc::new(Self {
            media,
            mix: Arc::new(Mutex::new((100, false))),
            status_tx: Arc::new(status_tx),
            poller: Mutex::new(None),
        });
        output.start_poller(config.status_poll_interval);
        output
    }

    fn start_poller(&self, poll_interval: Duration) {
        let media = Arc::clone(&self.media);
        let mix = Arc::clone(&self.mix);
        let status_tx = Arc::clone(&self.status_tx);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (volume, muted) = *mix.lock();
                let status = RemoteStatus {
                    position: media.position().await,
                    duration: media.duration().await,
                    playing: media.is_playing().await,
                    volume,
                    muted,
                    device_name: LOCAL_DEVICE_NAME.to_string(),
                };
                status_tx.send_replace(status);
            }
        });

        if let Some(previous) = self.poller.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for LocalOutput {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl OutputAdapter for LocalOutput {
    fn kind(&self) -> OutputKind {
        OutputKind::Local
    }

    fn supported_ops(&self) -> OpsSupport {
        OpsSupport::full()
    }

    fn device_name(&self) -> String {
        LOCAL_DEVICE_NAME.to_string()
    }

    async fn is_connected(&self) -> bool {
        true
    }

    async fn connect(&self) -> bool {
        true
    }

    async fn disconnect(&self) {
        // Nothing to tear down; quiesce the handle for symmetry.
        let _ = self.media.pause().await;
    }

    async fn load_media(&self, request: LoadRequest) -> bool {
        if self.media.set_source(&request.url).await.is_err() {
            return false;
        }
        if !request.start.is_zero() && self.media.seek(request.start).await.is_err() {
            return false;
        }
        true
    }

    async fn play(&self) -> bool {
        match self.media.play().await {
            Ok(()) => true,
            Err(err) => {
                debug!(error = %err, "local play failed");
                false
            }
        }
    }

    async fn pause(&self) -> bool {
        self.media.pause().await.is_ok()
    }

    async fn stop(&self) -> bool {
        let paused = self.media.pause().await.is_ok();
        let rewound = self.media.seek(Duration::ZERO).await.is_ok();
        paused && rewound
    }

    async fn seek(&self, position: Duration) -> bool {
        self.media.seek(position).await.is_ok()
    }

    async fn set_volume(&self, level: u8) -> bool {
        let level = level.min(100);
        self.mix.lock().0 = level;
        self.media.set_volume(f32::from(level) / 100.0).await.is_ok()
    }

    async fn set_muted(&self, muted: bool) -> bool {
        self.mix.lock().1 = muted;
        self.media.set_muted(muted).await.is_ok()
    }

    fn status(&self) -> watch::Receiver<RemoteStatus> {
        self.status_tx.subscribe()
    }
}
