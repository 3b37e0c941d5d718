use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::audio::PlaybackEngine;

use super::state::{AudioState, StatusSender};

/// Periodic progress publisher. Owns at most one background task.
pub(crate) struct ProgressSampler {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl ProgressSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Start sampling, replacing any task that is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<E: PlaybackEngine>(&mut self, engine: Arc<E>, status: StatusSender) {
        self.stop();
        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                status.emit(AudioState::Progress(engine.current_position()));
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ProgressSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
