//! Embedded cover art, extracted once per track into a PNG disk cache.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{DynamicImage, ImageFormat};
use lofty::prelude::TaggedFileExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ArtworkError {
    #[error("failed to read tags: {0}")]
    Tags(#[from] lofty::error::LoftyError),
    #[error("no embedded artwork in {}", .0.display())]
    NoArtwork(PathBuf),
    #[error("failed to decode artwork: {0}")]
    Image(#[from] image::ImageError),
    #[error("artwork cache i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("artwork task failed: {0}")]
    Task(#[from] JoinError),
}

/// Resolves a track's embedded picture to a file the desktop can show.
#[derive(Debug, Clone)]
pub struct ArtworkLoader {
    cache_dir: PathBuf,
    max_size: u32,
}

impl ArtworkLoader {
    pub fn new(cache_dir: impl Into<PathBuf>, max_size: u32) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_size: max_size.max(1),
        }
    }

    /// Where the artwork for `track` is (or will be) cached.
    pub fn cache_path(&self, track: &Path) -> PathBuf {
        let key = blake3::hash(track.as_os_str().as_encoded_bytes());
        self.cache_dir.join(format!("{}.png", key.to_hex()))
    }

    /// Resolve the artwork for `track`, extracting it on a cache miss.
    pub async fn load(&self, track: &Path) -> Result<PathBuf, ArtworkError> {
        let dest = self.cache_path(track);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(path = %dest.display(), "artwork cache hit");
            return Ok(dest);
        }

        let track = track.to_path_buf();
        let max_size = self.max_size;
        tokio::task::spawn_blocking(move || extract(&track, &dest, max_size)).await?
    }

    /// Resolve the artwork for `track` in the background. `callback` runs
    /// exactly once with the outcome; failures are not retried.
    pub fn request<F>(&self, track: PathBuf, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<PathBuf, ArtworkError>) + Send + 'static,
    {
        let loader = self.clone();
        tokio::spawn(async move {
            let result = loader.load(&track).await;
            if let Err(e) = &result {
                debug!(track = %track.display(), error = %e, "no artwork");
            }
            callback(result);
        })
    }
}

fn extract(track: &Path, dest: &Path, max_size: u32) -> Result<PathBuf, ArtworkError> {
    let tagged = lofty::read_from_path(track)?;
    let picture = tagged
        .tags()
        .iter()
        .flat_map(|tag| tag.pictures())
        .next()
        .ok_or_else(|| ArtworkError::NoArtwork(track.to_path_buf()))?;

    let img = image::load_from_memory(picture.data())?;
    let img = fit_within(img, max_size);

    if let Some(dir) = dest.parent() {
        std::fs::create_dir_all(dir)?;
    }
    // Readers only ever see a complete file at `dest`.
    let tmp = temp_path(dest);
    if let Err(e) = img.save_with_format(&tmp, ImageFormat::Png) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    std::fs::rename(&tmp, dest)?;

    debug!(track = %track.display(), path = %dest.display(), "artwork cached");
    Ok(dest.to_path_buf())
}

/// A sibling of `dest` that no other extraction in any process writes to.
fn temp_path(dest: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!("{name}.{}.{seq}.part", std::process::id()))
}

/// Shrink `img` so neither side exceeds `max_size`. Smaller images are kept as is.
fn fit_within(img: DynamicImage, max_size: u32) -> DynamicImage {
    if img.width() <= max_size && img.height() <= max_size {
        img
    } else {
        img.thumbnail(max_size, max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cache_path_is_stable_per_track() {
        let loader = ArtworkLoader::new("/cache", 256);
        let a = loader.cache_path(Path::new("/music/a.mp3"));

        assert_eq!(a, loader.cache_path(Path::new("/music/a.mp3")));
        assert_ne!(a, loader.cache_path(Path::new("/music/b.mp3")));
        assert!(a.starts_with("/cache"));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[test]
    fn fit_within_only_shrinks() {
        let big = DynamicImage::new_rgba8(1000, 500);
        let fitted = fit_within(big, 256);
        assert_eq!((fitted.width(), fitted.height()), (256, 128));

        let small = DynamicImage::new_rgba8(64, 32);
        let kept = fit_within(small, 256);
        assert_eq!((kept.width(), kept.height()), (64, 32));
    }

    #[test]
    fn concurrent_extractions_use_distinct_temp_files() {
        let dest = Path::new("/cache/abc.png");
        let a = temp_path(dest);
        let b = temp_path(dest);

        assert_ne!(a, b);
        assert_eq!(a.parent(), dest.parent());
        assert_eq!(b.parent(), dest.parent());
        assert!(a.to_string_lossy().ends_with(".part"));
    }

    #[tokio::test]
    async fn cached_artwork_is_returned_without_reading_the_track() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtworkLoader::new(dir.path(), 256);
        let track = Path::new("/not/on/disk.flac");
        std::fs::write(loader.cache_path(track), b"png").unwrap();

        let path = loader.load(track).await.unwrap();

        assert_eq!(path, loader.cache_path(track));
    }

    #[tokio::test]
    async fn files_without_artwork_fail_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let track = dir.path().join("silence.mp3");
        std::fs::write(&track, b"not audio").unwrap();
        let loader = ArtworkLoader::new(dir.path().join("cache"), 256);

        assert!(loader.load(&track).await.is_err());
        assert!(!loader.cache_path(&track).exists());
    }

    #[tokio::test]
    async fn request_resolves_exactly_once_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ArtworkLoader::new(dir.path(), 256);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel();

        let counter = calls.clone();
        let task = loader.request(PathBuf::from("/missing/track.mp3"), move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });
        task.await.unwrap();

        let result = rx.await.unwrap();
        assert!(matches!(result, Err(ArtworkError::Tags(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
