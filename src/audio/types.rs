//! Engine-facing types.
//!
//! This module defines what the engine queues (`MediaItem`), what it reports
//! (`EngineState`, `EngineEvent`), the commands sent to the audio thread and
//! the snapshot the thread publishes for the readable properties.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One entry of the engine queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub uri: PathBuf,
    /// Duration hint from the tags, used when the decoder cannot tell.
    pub duration: Option<Duration>,
}

/// Coarse engine state, reported through `EngineEvent::PlaybackStateChanged`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing loaded.
    Idle,
    /// Opening/decoding the current item.
    Buffering,
    /// The current item is loaded and can play.
    Ready,
    /// Reached the end of the queue.
    Ended,
}

/// Callbacks from the engine, delivered in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PlaybackStateChanged(EngineState),
    IsPlayingChanged(bool),
    /// The queue item at this index became current.
    MediaItemTransition(usize),
    Error(String),
}

#[derive(Debug)]
pub(crate) enum AudioCmd {
    /// Replace the queue; nothing is loaded until `Prepare`/`Play`.
    SetQueue(Vec<MediaItem>),
    /// Load the current item paused.
    Prepare,
    Play,
    Pause,
    /// Seek within the current item.
    SeekTo(Duration),
    /// Seek relative to the current position, in milliseconds.
    SeekBy(i64),
    /// Make `index` the current item, starting from its beginning.
    SeekToDefaultPosition(usize),
    Next,
    Previous,
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Readable engine properties, refreshed by the audio thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub index: Option<usize>,
    pub position: Duration,
    pub duration: Duration,
    pub playing: bool,
    pub queue_len: usize,
}

pub type SnapshotHandle = Arc<Mutex<EngineSnapshot>>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no audio output device: {0}")]
    Output(String),
    #[error("audio thread exited before it was ready")]
    ThreadGone,
}
