//! Playback engine: the transport contract and its `rodio` implementation.
//!
//! `RodioEngine` runs decoding and output on a dedicated audio thread and
//! reports what happened as `EngineEvent`s.

mod engine;
mod player;
mod queue;
mod sink;
mod thread;
mod types;

pub use engine::PlaybackEngine;
pub use player::RodioEngine;
pub use types::{EngineError, EngineEvent, EngineState, MediaItem};

#[cfg(test)]
pub(crate) mod fake;
