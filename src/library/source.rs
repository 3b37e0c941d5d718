use std::future::Future;
use std::path::PathBuf;

use tracing::info;

use crate::config::LibrarySettings;

use super::model::Track;
use super::scan::scan;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("library directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("library scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Anything that can hand the app model an ordered list of tracks.
pub trait TrackSource {
    fn get_tracks(&self) -> impl Future<Output = Result<Vec<Track>, LibraryError>> + Send;
}

/// Tracks found on disk under `root`.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
    settings: LibrarySettings,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>, settings: LibrarySettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }
}

impl TrackSource for LocalLibrary {
    async fn get_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::NotFound(self.root.clone()));
        }

        let root = self.root.clone();
        let settings = self.settings.clone();
        let tracks = tokio::task::spawn_blocking(move || scan(&root, &settings)).await?;

        info!(root = %self.root.display(), count = tracks.len(), "loaded local library");
        Ok(tracks)
    }
}
