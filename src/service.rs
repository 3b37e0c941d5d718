//! Playback service: translates engine callbacks into an observable
//! `AudioState` stream and user intents into engine calls.

mod handler;
mod sampler;
mod state;

pub use handler::AudioServiceHandler;
pub use state::{AudioState, PlayerEvent, ServiceError};

#[cfg(test)]
mod tests;
