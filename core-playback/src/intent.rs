//! Playback intent and session state types.

use bridge_traits::queue::Track;
use serde::{Deserialize, Serialize};

/// Repeat behavior applied at end of media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the queue.
    #[default]
    Off,
    /// Restart the current track.
    One,
    /// Wrap around to the start of the queue.
    All,
}

/// Public playback session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No active session.
    Stopped,
    /// A track is being buffered/connected/loaded.
    Loading,
    Playing,
    Paused,
    /// A seek is in flight; displayed position is optimistic.
    Seeking,
}

impl PlayerState {
    /// Returns `true` while a load or seek pipeline is running.
    pub fn is_loading(&self) -> bool {
        matches!(self, PlayerState::Loading | PlayerState::Seeking)
    }
}

/// The authoritative play/pause/track intent.
///
/// Owned exclusively by the playback controller; adapters and the UI are
/// consumers, never owners. A divergent transport-reported play state is
/// adopted back into the intent by the controller (one-directional
/// reconciliation), never written here directly by telemetry.
#[derive(Debug, Clone, Default)]
pub struct PlaybackIntent {
    pub playing: bool,
    /// `None` means stopped / no session.
    pub track: Option<Track>,
    pub repeat: RepeatMode,
}

impl PlaybackIntent {
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|track| track.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intent_is_stopped() {
        let intent = PlaybackIntent::default();
        assert!(!intent.playing);
        assert!(intent.track.is_none());
        assert_eq!(intent.repeat, RepeatMode::Off);
    }

    #[test]
    fn loading_states() {
        assert!(PlayerState::Loading.is_loading());
        assert!(PlayerState::Seeking.is_loading());
        assert!(!PlayerState::Playing.is_loading());
        assert!(!PlayerState::Stopped.is_loading());
    }

    #[test]
    fn repeat_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RepeatMode::All).unwrap(), "\"all\"");
    }
}
