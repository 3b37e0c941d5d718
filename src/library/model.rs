use std::path::PathBuf;
use std::time::Duration;

/// One playable audio file with the metadata the player shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Location of the audio file.
    pub uri: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// File stem, used as a subtitle when the artist tag is missing.
    pub display_name: String,
    pub duration: Option<Duration>,
    /// Label rendered in the track list (see `library.display_fields`).
    pub display: String,
    /// Position of this track in the loaded queue.
    pub index: usize,
}
