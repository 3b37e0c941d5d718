use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

use super::queue::{PreviousAction, clamp_seek, next_index, offset_position, previous_action};
use super::sink::create_sink_at;
use super::types::{AudioCmd, EngineError, EngineEvent, EngineState, MediaItem, SnapshotHandle};

/// How often the thread refreshes the snapshot and checks for end of track.
const TICK: Duration = Duration::from_millis(100);

/// State owned by the audio thread.
struct Transport {
    stream: OutputStream,
    queue: Vec<MediaItem>,
    index: Option<usize>,
    sink: Option<Sink>,
    paused: bool,
    // Elapsed time = accumulated + time since started_at (while playing).
    started_at: Option<Instant>,
    accumulated: Duration,
    duration: Duration,
    snapshot: SnapshotHandle,
    events: UnboundedSender<EngineEvent>,
}

impl Transport {
    fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    fn is_playing(&self) -> bool {
        self.sink.is_some() && !self.paused
    }

    fn publish(&self) {
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.index = self.index;
            snap.position = clamp_seek(self.elapsed(), self.duration);
            snap.duration = self.duration;
            snap.playing = self.is_playing();
            snap.queue_len = self.queue.len();
        }
    }

    fn emit(&self, event: EngineEvent) {
        // The receiver only goes away during shutdown.
        let _ = self.events.send(event);
    }

    fn set_playing(&mut self, playing: bool) {
        let was_playing = self.is_playing();
        if playing {
            if let Some(s) = self.sink.as_ref() {
                s.play();
                if self.paused {
                    self.started_at = Some(Instant::now());
                }
                self.paused = false;
            }
        } else {
            if let Some(s) = self.sink.as_ref() {
                s.pause();
            }
            if let Some(st) = self.started_at.take() {
                self.accumulated += st.elapsed();
            }
            self.paused = true;
        }

        self.publish();
        if was_playing != self.is_playing() {
            self.emit(EngineEvent::IsPlayingChanged(self.is_playing()));
        }
    }

    /// Load the current item at `start_at`, keeping the play/pause state.
    fn load_at(&mut self, start_at: Duration) -> bool {
        let Some(i) = self.index else {
            return false;
        };
        let keep_playing = self.is_playing();

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.started_at = None;
        self.accumulated = start_at;
        self.publish();
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Buffering));

        match create_sink_at(&self.stream, &self.queue[i], start_at) {
            Ok(loaded) => {
                self.sink = Some(loaded.sink);
                self.duration = loaded.duration.unwrap_or_default();
                if keep_playing {
                    if let Some(s) = self.sink.as_ref() {
                        s.play();
                    }
                    self.started_at = Some(Instant::now());
                }
                self.publish();
                self.emit(EngineEvent::PlaybackStateChanged(EngineState::Ready));
                true
            }
            Err(e) => {
                error!(error = %e, "failed to load media item");
                self.paused = true;
                self.duration = Duration::ZERO;
                self.publish();
                if keep_playing {
                    self.emit(EngineEvent::IsPlayingChanged(false));
                }
                self.emit(EngineEvent::Error(e.to_string()));
                false
            }
        }
    }

    fn set_queue(&mut self, items: Vec<MediaItem>) {
        let was_playing = self.is_playing();
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.queue = items;
        self.index = if self.queue.is_empty() { None } else { Some(0) };
        self.paused = true;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        self.duration = Duration::ZERO;
        self.publish();

        if was_playing {
            self.emit(EngineEvent::IsPlayingChanged(false));
        }
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Idle));
    }

    fn prepare(&mut self) {
        if self.sink.is_none() {
            self.load_at(Duration::ZERO);
        }
    }

    fn play(&mut self) {
        if self.sink.is_none() && !self.load_at(Duration::ZERO) {
            return;
        }
        self.set_playing(true);
    }

    fn seek_to(&mut self, position: Duration) {
        if self.index.is_none() {
            return;
        }
        let target = clamp_seek(position, self.duration);
        self.load_at(target);
    }

    fn select(&mut self, index: usize) {
        if index >= self.queue.len() {
            warn!(index, len = self.queue.len(), "ignoring out-of-range queue index");
            return;
        }
        self.index = Some(index);
        self.duration = Duration::ZERO;
        self.emit(EngineEvent::MediaItemTransition(index));
        self.load_at(Duration::ZERO);
    }

    fn next(&mut self) {
        if let Some(i) = next_index(self.index, self.queue.len()) {
            self.select(i);
        }
    }

    fn previous(&mut self) {
        match previous_action(self.index, self.elapsed()) {
            PreviousAction::Select(i) => self.select(i),
            PreviousAction::Restart => self.seek_to(Duration::ZERO),
        }
    }

    /// Auto-advance when the current item ran out.
    fn tick(&mut self) {
        let finished = self.is_playing() && self.sink.as_ref().is_some_and(Sink::empty);
        if finished {
            match next_index(self.index, self.queue.len()) {
                Some(i) => {
                    debug!(index = i, "advancing to next item");
                    self.select(i);
                }
                None => {
                    self.set_playing(false);
                    if let Some(old) = self.sink.take() {
                        old.stop();
                    }
                    self.accumulated = self.duration;
                    self.publish();
                    self.emit(EngineEvent::PlaybackStateChanged(EngineState::Ended));
                }
            }
        }
        self.publish();
    }

    fn quit(&mut self, fade_out_ms: u64) {
        if let Some(s) = self.sink.take() {
            if !self.paused {
                fade_out_sink(&s, fade_out_ms);
            }
            s.stop();
        }
        self.paused = true;
        self.started_at = None;
        self.publish();
    }
}

fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(1.0 - t);
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}

/// Spawn the audio thread. The thread opens the output device first and
/// reports the outcome on `ready` before it starts taking commands.
pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    ready: SyncSender<Result<(), EngineError>>,
    snapshot: SnapshotHandle,
    events: UnboundedSender<EngineEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(s) => s,
            Err(e) => {
                let _ = ready.send(Err(EngineError::Output(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped, which would tear the TUI.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));

        let mut transport = Transport {
            stream,
            queue: Vec::new(),
            index: None,
            sink: None,
            paused: true,
            started_at: None,
            accumulated: Duration::ZERO,
            duration: Duration::ZERO,
            snapshot,
            events,
        };

        loop {
            match rx.recv_timeout(TICK) {
                Ok(cmd) => {
                    debug!(?cmd, "audio command");
                    match cmd {
                        AudioCmd::SetQueue(items) => transport.set_queue(items),
                        AudioCmd::Prepare => transport.prepare(),
                        AudioCmd::Play => transport.play(),
                        AudioCmd::Pause => transport.set_playing(false),
                        AudioCmd::SeekTo(position) => transport.seek_to(position),
                        AudioCmd::SeekBy(delta_ms) => {
                            let target =
                                offset_position(transport.elapsed(), delta_ms, transport.duration);
                            transport.seek_to(target);
                        }
                        AudioCmd::SeekToDefaultPosition(i) => transport.select(i),
                        AudioCmd::Next => transport.next(),
                        AudioCmd::Previous => transport.previous(),
                        AudioCmd::Quit { fade_out_ms } => {
                            transport.quit(fade_out_ms);
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => transport.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
