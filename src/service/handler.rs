use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error};

use crate::audio::{EngineEvent, EngineState, MediaItem, PlaybackEngine};

use super::sampler::ProgressSampler;
use super::state::{AudioState, PlayerEvent, ServiceError, StatusSender};

/// Owns the connection to the playback engine.
///
/// Engine callbacks (`on_*`) and commands (`handle_command`) both end up as
/// `AudioState` values on a broadcast stream. While audio plays, a single
/// progress sampler publishes the position at a fixed interval.
///
/// Methods that may start the sampler must be called from within a tokio
/// runtime.
pub struct AudioServiceHandler<E: PlaybackEngine> {
    engine: Arc<E>,
    status: StatusSender,
    sampler: Mutex<ProgressSampler>,
}

impl<E: PlaybackEngine> AudioServiceHandler<E> {
    pub fn new(engine: Arc<E>, progress_interval: Duration) -> Self {
        Self {
            engine,
            status: StatusSender::new(),
            sampler: Mutex::new(ProgressSampler::new(progress_interval)),
        }
    }

    /// Subscribe to status updates emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AudioState> {
        self.status.subscribe()
    }

    /// The most recently emitted status.
    pub fn state(&self) -> AudioState {
        self.status.last()
    }

    /// Replace the engine queue and start loading its first item.
    pub fn submit_queue(&self, items: Vec<MediaItem>) {
        debug!(len = items.len(), "submitting queue");
        self.engine.set_queue(items);
        self.engine.prepare();
    }

    pub fn handle_command(&self, command: PlayerEvent) -> Result<(), ServiceError> {
        debug!(?command, "player command");
        match command {
            PlayerEvent::Backward => self.engine.seek_back(),
            PlayerEvent::Forward => self.engine.seek_forward(),
            PlayerEvent::SeekToNext => self.engine.seek_to_next(),
            PlayerEvent::SeekToPrevious => self.engine.seek_to_previous(),
            PlayerEvent::PlayPause => self.play_or_pause(),
            PlayerEvent::SeekTo(position) => self.engine.seek_to(position),
            PlayerEvent::SeekToFraction(fraction) => {
                if !fraction.is_finite() {
                    return Err(ServiceError::InvalidFraction(fraction));
                }
                let fraction = fraction.clamp(0.0, 1.0);
                self.engine.seek_to(self.engine.duration().mul_f32(fraction));
            }
            PlayerEvent::SelectTrack(index) => self.select_track(index)?,
            PlayerEvent::Stop => {
                self.engine.pause();
                self.stop_progress_update();
                self.status.emit(AudioState::Playing(false));
            }
        }
        Ok(())
    }

    /// Route an engine callback to the matching `on_*` handler.
    pub fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackStateChanged(state) => self.on_playback_state_changed(state),
            EngineEvent::IsPlayingChanged(playing) => self.on_is_playing_changed(playing),
            EngineEvent::MediaItemTransition(index) => self.on_media_item_transition(index),
            EngineEvent::Error(reason) => self.on_player_error(reason),
        }
    }

    /// Feed engine callbacks into this handler until the engine hangs up.
    pub async fn pump_engine_events(&self, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_engine_event(event);
        }
        debug!("engine event stream closed");
    }

    pub fn on_playback_state_changed(&self, state: EngineState) {
        match state {
            EngineState::Buffering => self
                .status
                .emit(AudioState::Buffering(self.engine.current_position())),
            EngineState::Ready => self.status.emit(AudioState::Ready(self.engine.duration())),
            EngineState::Idle | EngineState::Ended => {}
        }
    }

    pub fn on_is_playing_changed(&self, is_playing: bool) {
        self.status.emit(AudioState::Playing(is_playing));
        if let Some(index) = self.engine.current_index() {
            self.status.emit(AudioState::CurrentTrack(index));
        }

        if is_playing {
            self.start_progress_update();
        } else {
            self.stop_progress_update();
            self.status.emit(AudioState::Playing(false));
        }
    }

    /// The current item changed (skip, previous or auto-advance).
    pub fn on_media_item_transition(&self, index: usize) {
        self.status.emit(AudioState::CurrentTrack(index));
    }

    pub fn on_player_error(&self, reason: String) {
        error!(%reason, "playback failed");
        self.stop_progress_update();
        self.status.emit(AudioState::Failed(reason));
    }

    fn select_track(&self, index: usize) -> Result<(), ServiceError> {
        let len = self.engine.media_item_count();
        if index >= len {
            return Err(ServiceError::InvalidSelection { index, len });
        }

        if self.engine.current_index() == Some(index) {
            self.play_or_pause();
        } else {
            self.engine.seek_to_default_position(index);
            self.engine.play();
            self.status.emit(AudioState::Playing(true));
            self.status.emit(AudioState::CurrentTrack(index));
            self.start_progress_update();
        }
        Ok(())
    }

    fn play_or_pause(&self) {
        if self.engine.is_playing() {
            self.engine.pause();
            self.stop_progress_update();
            self.status.emit(AudioState::Playing(false));
        } else {
            self.engine.play();
            self.status.emit(AudioState::Playing(true));
            self.start_progress_update();
        }
    }

    // ProgressSampler has no invariant a panic could break.
    fn sampler(&self) -> MutexGuard<'_, ProgressSampler> {
        self.sampler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_progress_update(&self) {
        self.sampler().start(self.engine.clone(), self.status.clone());
    }

    fn stop_progress_update(&self) {
        self.sampler().stop();
    }

    #[cfg(test)]
    pub(crate) fn sampler_running(&self) -> bool {
        self.sampler().is_running()
    }

    #[cfg(test)]
    pub(crate) fn poison_sampler_lock(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = self.sampler.lock();
                    panic!("poisoning the sampler lock");
                })
                .join();
        });
    }
}
