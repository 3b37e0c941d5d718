//! In-memory `PlaybackEngine` for tests: records every call and lets the
//! test set the readable properties directly.

use std::sync::Mutex;
use std::time::Duration;

use super::engine::PlaybackEngine;
use super::types::{EngineSnapshot, MediaItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineCall {
    SetQueue(usize),
    Prepare,
    Play,
    Pause,
    SeekTo(Duration),
    SeekForward,
    SeekBack,
    SeekToNext,
    SeekToPrevious,
    SeekToDefaultPosition(usize),
}

#[derive(Default)]
pub(crate) struct FakeEngine {
    pub state: Mutex<EngineSnapshot>,
    pub calls: Mutex<Vec<EngineCall>>,
}

impl FakeEngine {
    pub fn with_queue(len: usize) -> Self {
        let engine = Self::default();
        engine.set(|s| {
            s.queue_len = len;
            s.index = (len > 0).then_some(0);
        });
        engine
    }

    pub fn set(&self, f: impl FnOnce(&mut EngineSnapshot)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlaybackEngine for FakeEngine {
    fn set_queue(&self, items: Vec<MediaItem>) {
        let len = items.len();
        self.set(|s| {
            s.queue_len = len;
            s.index = (len > 0).then_some(0);
        });
        self.record(EngineCall::SetQueue(len));
    }

    fn prepare(&self) {
        self.record(EngineCall::Prepare);
    }

    fn play(&self) {
        self.set(|s| s.playing = true);
        self.record(EngineCall::Play);
    }

    fn pause(&self) {
        self.set(|s| s.playing = false);
        self.record(EngineCall::Pause);
    }

    fn seek_to(&self, position: Duration) {
        self.set(|s| s.position = position);
        self.record(EngineCall::SeekTo(position));
    }

    fn seek_forward(&self) {
        self.record(EngineCall::SeekForward);
    }

    fn seek_back(&self) {
        self.record(EngineCall::SeekBack);
    }

    fn seek_to_next(&self) {
        self.record(EngineCall::SeekToNext);
    }

    fn seek_to_previous(&self) {
        self.record(EngineCall::SeekToPrevious);
    }

    fn seek_to_default_position(&self, index: usize) {
        self.set(|s| {
            s.index = Some(index);
            s.position = Duration::ZERO;
        });
        self.record(EngineCall::SeekToDefaultPosition(index));
    }

    fn current_position(&self) -> Duration {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Duration {
        self.state.lock().unwrap().duration
    }

    fn current_index(&self) -> Option<usize> {
        self.state.lock().unwrap().index
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn media_item_count(&self) -> usize {
        self.state.lock().unwrap().queue_len
    }
}
