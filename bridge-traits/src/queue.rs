//! Track and queue supplier contracts.
//!
//! The queue supplier lives outside this engine: it authenticates against
//! the cloud store, walks folders, and flattens the library into an ordered
//! track list. The engine only consumes the list and the per-track stream
//! URLs.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable library entry.
///
/// Tracks are immutable once created, except for `duration`, which the
/// supplier may leave unset; the engine discovers the real duration during
/// playback and caches it process-wide keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque, unique identifier.
    pub id: String,
    pub title: String,
    /// Opaque stream endpoint. Supports byte-range requests and may require
    /// a bearer credential appended by the caller.
    pub stream_url: String,
    pub cover_url: Option<String>,
    /// Declared duration, when the supplier knows it up front.
    pub duration: Option<Duration>,
    /// Containing folder path, used for grouping only.
    pub folder: String,
}

/// Supplies the ordered track list for the current library view.
#[async_trait]
pub trait QueueSource: Send + Sync {
    /// The ordered track list. Order defines next/previous semantics.
    async fn tracks(&self) -> Result<Vec<Track>>;

    /// Re-enumerate the backing store.
    async fn refresh(&self) -> Result<()>;
}
