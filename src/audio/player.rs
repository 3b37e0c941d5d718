use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::config::PlaybackSettings;

use super::engine::PlaybackEngine;
use super::thread::spawn_audio_thread;
use super::types::{
    AudioCmd, EngineError, EngineEvent, EngineSnapshot, MediaItem, SnapshotHandle,
};

/// `PlaybackEngine` backed by `rodio`, driven from a dedicated audio thread.
pub struct RodioEngine {
    tx: Sender<AudioCmd>,
    snapshot: SnapshotHandle,
    seek_forward_ms: u64,
    seek_back_ms: u64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl RodioEngine {
    /// Open the default output device and start the audio thread. Engine
    /// callbacks are delivered on `events`.
    pub fn new(
        settings: &PlaybackSettings,
        events: UnboundedSender<EngineEvent>,
    ) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(EngineSnapshot::default()));

        let handle = spawn_audio_thread(rx, ready_tx, snapshot.clone(), events);
        ready_rx.recv().map_err(|_| EngineError::ThreadGone)??;

        Ok(Self {
            tx,
            snapshot,
            seek_forward_ms: settings.seek_forward_ms,
            seek_back_ms: settings.seek_back_ms,
            join: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, cmd: AudioCmd) {
        if let Err(e) = self.tx.send(cmd) {
            warn!(cmd = ?e.0, "audio thread is gone, dropping command");
        }
    }

    fn read<T>(&self, f: impl FnOnce(&EngineSnapshot) -> T) -> T {
        match self.snapshot.lock() {
            Ok(snap) => f(&snap),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn update(&self, f: impl FnOnce(&mut EngineSnapshot)) {
        if let Ok(mut snap) = self.snapshot.lock() {
            f(&mut snap);
        }
    }

    /// Fade out, stop the audio thread and wait for it to exit.
    pub fn shutdown(&self, fade_out: Duration) {
        self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl PlaybackEngine for RodioEngine {
    fn set_queue(&self, items: Vec<MediaItem>) {
        // Callers validate indices against the queue right after submitting it,
        // so the length is published eagerly rather than on the next tick.
        let len = items.len();
        self.update(|snap| {
            snap.queue_len = len;
            snap.index = (len > 0).then_some(0);
        });
        self.send(AudioCmd::SetQueue(items));
    }

    fn prepare(&self) {
        self.send(AudioCmd::Prepare);
    }

    fn play(&self) {
        self.update(|snap| snap.playing = true);
        self.send(AudioCmd::Play);
    }

    fn pause(&self) {
        self.update(|snap| snap.playing = false);
        self.send(AudioCmd::Pause);
    }

    fn seek_to(&self, position: Duration) {
        self.send(AudioCmd::SeekTo(position));
    }

    fn seek_forward(&self) {
        self.send(AudioCmd::SeekBy(self.seek_forward_ms as i64));
    }

    fn seek_back(&self) {
        self.send(AudioCmd::SeekBy(-(self.seek_back_ms as i64)));
    }

    fn seek_to_next(&self) {
        self.send(AudioCmd::Next);
    }

    fn seek_to_previous(&self) {
        self.send(AudioCmd::Previous);
    }

    fn seek_to_default_position(&self, index: usize) {
        self.update(|snap| snap.index = Some(index));
        self.send(AudioCmd::SeekToDefaultPosition(index));
    }

    fn current_position(&self) -> Duration {
        self.read(|snap| snap.position)
    }

    fn duration(&self) -> Duration {
        self.read(|snap| snap.duration)
    }

    fn current_index(&self) -> Option<usize> {
        self.read(|snap| snap.index)
    }

    fn is_playing(&self) -> bool {
        self.read(|snap| snap.playing)
    }

    fn media_item_count(&self) -> usize {
        self.read(|snap| snap.queue_len)
    }
}
