use crate::app::{App, PlaybackState};
use crate::artwork::ArtworkLoader;
use crate::audio::PlaybackEngine;
use crate::mpris::MprisHandle;

pub fn update_mpris<E: PlaybackEngine>(mpris: &MprisHandle, app: &App<E>) {
    mpris.set_track_metadata(app.current_index(), app.current.as_ref());
    mpris.set_playback(app.playback_state());
}

/// Last values pushed to MPRIS, so unchanged state is not re-sent every frame.
#[derive(Debug, Default)]
pub struct MprisSync {
    last_index: Option<usize>,
    last_playback: PlaybackState,
}

impl MprisSync {
    /// Push changes in the current track or playback state. A new track also
    /// triggers an artwork lookup that attaches to that track only.
    pub fn sync<E: PlaybackEngine>(
        &mut self,
        mpris: &MprisHandle,
        artwork: Option<&ArtworkLoader>,
        app: &App<E>,
    ) {
        let index = app.current_index();
        let playback = app.playback_state();

        if index != self.last_index {
            update_mpris(mpris, app);
            if let (Some(i), Some(track), Some(loader)) = (index, app.current.as_ref(), artwork) {
                let handle = mpris.clone();
                loader.request(track.uri.clone(), move |result| {
                    if let Ok(path) = result {
                        handle.set_art_url_for(i, path);
                    }
                });
            }
        } else if playback != self.last_playback {
            mpris.set_playback(playback);
        }

        self.last_index = index;
        self.last_playback = playback;
    }
}
