use std::time::Duration;

use super::types::MediaItem;

/// Transport controls and readable state of a playback engine.
///
/// Commands are fire-and-forget: their outcome is reported asynchronously as
/// `EngineEvent`s. Implementations must be shareable across tasks since the
/// progress sampler reads `current_position` from a background task.
pub trait PlaybackEngine: Send + Sync + 'static {
    fn set_queue(&self, items: Vec<MediaItem>);
    fn prepare(&self);
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, position: Duration);
    fn seek_forward(&self);
    fn seek_back(&self);
    fn seek_to_next(&self);
    fn seek_to_previous(&self);
    fn seek_to_default_position(&self, index: usize);

    fn current_position(&self) -> Duration;
    /// Duration of the current item, `Duration::ZERO` when unknown.
    fn duration(&self) -> Duration;
    fn current_index(&self) -> Option<usize>;
    fn is_playing(&self) -> bool;
    fn media_item_count(&self) -> usize;
}
