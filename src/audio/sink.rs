//! Utilities for creating `rodio` sinks from `MediaItem` values.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use super::types::MediaItem;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// A paused sink for one item plus the item's total duration, when known.
pub(super) struct LoadedSink {
    pub sink: Sink,
    pub duration: Option<Duration>,
}

/// Create a paused `Sink` for `item` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    item: &MediaItem,
    start_at: Duration,
) -> Result<LoadedSink, SinkError> {
    let path = item.uri.display().to_string();
    let file = File::open(&item.uri).map_err(|source| SinkError::Open {
        path: path.clone(),
        source,
    })?;

    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| SinkError::Decode {
        path,
        reason: e.to_string(),
    })?;
    let duration = decoder.total_duration().or(item.duration);

    let sink = Sink::connect_new(stream.mixer());
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    sink.append(decoder.skip_duration(start_at));
    sink.pause();

    Ok(LoadedSink { sink, duration })
}
