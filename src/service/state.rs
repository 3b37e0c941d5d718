use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

/// Status of the player as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AudioState {
    #[default]
    Initial,
    /// The engine is loading; carries the position it is loading at.
    Buffering(Duration),
    /// The current item is loaded; carries its duration.
    Ready(Duration),
    Playing(bool),
    Progress(Duration),
    /// Queue index of the item now current.
    CurrentTrack(usize),
    /// The engine could not play the current item.
    Failed(String),
}

/// User intents the handler turns into engine calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    PlayPause,
    /// Absolute position in the current item.
    SeekTo(Duration),
    /// Fraction of the current item's duration, `0.0..=1.0`.
    SeekToFraction(f32),
    Forward,
    Backward,
    SeekToNext,
    SeekToPrevious,
    /// Play the queue item at this index (toggles if it is already current).
    SelectTrack(usize),
    Stop,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid selection: track {index} is out of range (queue has {len})")]
    InvalidSelection { index: usize, len: usize },
    #[error("invalid seek fraction: {0}")]
    InvalidFraction(f32),
}

pub(crate) const STATUS_CAPACITY: usize = 64;

/// Write side of the status stream. Clones share the same channel and the
/// same "last value" slot.
#[derive(Clone)]
pub(crate) struct StatusSender {
    tx: broadcast::Sender<AudioState>,
    last: Arc<Mutex<AudioState>>,
}

impl StatusSender {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CAPACITY);
        Self {
            tx,
            last: Arc::new(Mutex::new(AudioState::Initial)),
        }
    }

    pub fn emit(&self, state: AudioState) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();
        // No subscribers is fine; the last value is still kept.
        let _ = self.tx.send(state);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioState> {
        self.tx.subscribe()
    }

    pub fn last(&self) -> AudioState {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
