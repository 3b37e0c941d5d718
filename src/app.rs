//! Application module: the view-model behind the terminal UI.
//!
//! `App` subscribes to the playback service's status stream, keeps the
//! display-ready fields the UI renders, and forwards UI intents to the
//! service.

mod format;
mod model;

pub use format::{format_duration, progress_fraction};
pub use model::*;
