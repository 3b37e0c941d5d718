//! Application model types: `App`, its UI intents and derived states.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::audio::{MediaItem, PlaybackEngine};
use crate::library::{LibraryError, Track, TrackSource};
use crate::service::{AudioServiceHandler, AudioState, PlayerEvent, ServiceError};

use super::format::{format_duration, progress_fraction};

/// Coarse playback state, as shown to the desktop (MPRIS).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Whether the engine has reported a loaded item yet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UiState {
    #[default]
    Initial,
    Ready,
}

/// Intents raised by the UI (keys, media controls).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UiEvent {
    PlayPause,
    /// Play the track at this list index.
    SelectedAudioChange(usize),
    /// Seek to a percentage (`0..=100`) of the current track.
    SeekTo(u8),
    SeekToNext,
    SeekToPrevious,
    Backward,
    Forward,
    /// Seek to a fraction (`0.0..=1.0`) of the current track.
    UpdateProgress(f32),
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("stale track index {index} (list has {len} tracks)")]
    StaleIndex { index: usize, len: usize },
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// The main application model.
pub struct App<E: PlaybackEngine> {
    service: Arc<AudioServiceHandler<E>>,
    status_rx: broadcast::Receiver<AudioState>,

    pub duration: Duration,
    /// Share of the current track played, `0.0..=1.0`.
    pub progress: f64,
    pub progress_string: String,
    pub is_playing: bool,
    pub current: Option<Track>,
    pub tracks: Vec<Track>,
    pub ui_state: UiState,
    pub last_error: Option<String>,

    pub selected: usize,
    pub current_dir: Option<String>,
    pub metadata_window: bool,
}

impl<E: PlaybackEngine> App<E> {
    /// Create an empty `App` subscribed to `service`.
    pub fn new(service: Arc<AudioServiceHandler<E>>) -> Self {
        let status_rx = service.subscribe();
        Self {
            service,
            status_rx,
            duration: Duration::ZERO,
            progress: 0.0,
            progress_string: format_duration(Duration::ZERO),
            is_playing: false,
            current: None,
            tracks: Vec::new(),
            ui_state: UiState::Initial,
            last_error: None,
            selected: 0,
            current_dir: None,
            metadata_window: false,
        }
    }

    /// Fetch the track list from `source` and queue it for playback.
    pub async fn load<S: TrackSource>(&mut self, source: &S) -> Result<usize, AppError> {
        let tracks = source.get_tracks().await?;
        let count = tracks.len();
        self.set_tracks(tracks);
        Ok(count)
    }

    /// Replace the track list and hand the matching queue to the service.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        let items: Vec<MediaItem> = tracks.iter().map(media_item).collect();
        self.tracks = tracks;
        self.selected = 0;
        self.current = None;
        self.service.submit_queue(items);
    }

    /// Apply every status the service emitted since the last call.
    ///
    /// Returns how many statuses were applied. If this receiver fell behind,
    /// the skipped values are superseded ones and are dropped.
    pub fn sync_status(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.status_rx.try_recv() {
                Ok(state) => {
                    if let Err(e) = self.apply(state) {
                        warn!(error = %e, "ignoring status update");
                    }
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "status receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        applied
    }

    /// Fold one status into the display fields.
    pub fn apply(&mut self, state: AudioState) -> Result<(), AppError> {
        match state {
            AudioState::Initial => self.ui_state = UiState::Initial,
            AudioState::Buffering(position) | AudioState::Progress(position) => {
                self.calculate_progress(position);
            }
            AudioState::Ready(duration) => {
                self.duration = duration;
                self.ui_state = UiState::Ready;
            }
            AudioState::Playing(playing) => self.is_playing = playing,
            AudioState::CurrentTrack(index) => {
                let track = self.tracks.get(index).ok_or(AppError::StaleIndex {
                    index,
                    len: self.tracks.len(),
                })?;
                self.current = Some(track.clone());
            }
            AudioState::Failed(reason) => {
                self.is_playing = false;
                self.last_error = Some(reason);
            }
        }
        Ok(())
    }

    /// Forward a UI intent to the playback service.
    pub fn on_ui_event(&mut self, event: UiEvent) -> Result<(), AppError> {
        let command = match event {
            UiEvent::PlayPause => PlayerEvent::PlayPause,
            UiEvent::SelectedAudioChange(index) => PlayerEvent::SelectTrack(index),
            UiEvent::SeekTo(percent) => {
                let percent = u32::from(percent.min(100));
                PlayerEvent::SeekTo(self.duration * percent / 100)
            }
            UiEvent::SeekToNext => PlayerEvent::SeekToNext,
            UiEvent::SeekToPrevious => PlayerEvent::SeekToPrevious,
            UiEvent::Backward => PlayerEvent::Backward,
            UiEvent::Forward => PlayerEvent::Forward,
            UiEvent::UpdateProgress(fraction) => PlayerEvent::SeekToFraction(fraction),
            UiEvent::Stop => PlayerEvent::Stop,
        };
        self.service.handle_command(command)?;
        self.last_error = None;
        Ok(())
    }

    /// Like `on_ui_event`, but keeps the failure for the status line instead of returning it.
    pub fn dispatch(&mut self, event: UiEvent) {
        if let Err(e) = self.on_ui_event(event) {
            warn!(?event, error = %e, "ui event rejected");
            self.last_error = Some(e.to_string());
        }
    }

    fn calculate_progress(&mut self, position: Duration) {
        self.progress = progress_fraction(position, self.duration);
        self.progress_string = format_duration(position);
    }

    /// Index of the track now current, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(|t| t.index)
    }

    pub fn playback_state(&self) -> PlaybackState {
        match (self.is_playing, self.current.is_some()) {
            (true, _) => PlaybackState::Playing,
            (false, true) => PlaybackState::Paused,
            (false, false) => PlaybackState::Stopped,
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Record the library directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn set_selected(&mut self, idx: usize) {
        if self.has_tracks() {
            self.selected = idx.min(self.tracks.len() - 1);
        }
    }

    /// Move selection to the next track, wrapping around.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping around.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.tracks.len() - 1);
        }
    }
}

fn media_item(track: &Track) -> MediaItem {
    MediaItem {
        uri: track.uri.clone(),
        duration: track.duration,
    }
}
