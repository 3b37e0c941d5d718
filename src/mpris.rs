use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, info, warn};
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::app::PlaybackState;
use crate::library::Track;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.tonearm";
const NOTIFY_POLL: Duration = Duration::from_millis(100);

/// Title and subtitle of the current track, as shown in notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub subtitle: String,
}

impl NowPlaying {
    pub fn from_track(track: &Track) -> Self {
        let title = match track.title.trim() {
            "" => "Unknown".to_string(),
            t => t.to_string(),
        };
        let subtitle = track
            .artist
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(&track.display_name)
            .to_string();
        Self { title, subtitle }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<ObjectPath<'static>>,
    art_url: Option<String>,
}

fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write side of the MPRIS state. Every change wakes the bus thread so it
/// can emit `PropertiesChanged`.
#[derive(Clone)]
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: PlaybackState) {
        lock(&self.state).playback = playback;
        self.changed();
    }

    /// Publish metadata for the track at queue `index`, or clear it.
    pub fn set_track_metadata(&self, index: Option<usize>, track: Option<&Track>) {
        let mut s = lock(&self.state);
        match track {
            Some(track) => {
                let now = NowPlaying::from_track(track);
                s.title = Some(now.title);
                s.artist = vec![now.subtitle];
                s.album = track.album.clone();
                s.url = Some(format!("file://{}", track.uri.display()));
                s.length_micros = track
                    .duration
                    .and_then(|d| i64::try_from(d.as_micros()).ok());
            }
            None => {
                s.title = None;
                s.artist.clear();
                s.album = None;
                s.url = None;
                s.length_micros = None;
            }
        }
        s.track_id = index
            .filter(|_| track.is_some())
            .and_then(|i| ObjectPath::try_from(format!("{OBJECT_PATH}/track/{i}")).ok());
        s.art_url = None;
        drop(s);
        self.changed();
    }

    /// Attach artwork to the track at `index`. Ignored if another track has
    /// become current in the meantime.
    pub fn set_art_url_for(&self, index: usize, art: PathBuf) {
        let expected = format!("{OBJECT_PATH}/track/{index}");
        let updated = {
            let mut s = lock(&self.state);
            let current = s.track_id.as_ref().map(|p| p.as_str()) == Some(expected.as_str());
            if current {
                s.art_url = Some(format!("file://{}", art.display()));
            }
            current
        };
        if updated {
            self.changed();
        } else {
            debug!(index, "dropping artwork for a track that is no longer current");
        }
    }

    fn changed(&self) {
        // The bus thread may not be running (no session bus).
        let _ = self.notify.send(());
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "tonearm"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        match lock(&self.state).playback {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let s = lock(&self.state);

        let mut put = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        put(
            "mpris:trackid",
            s.track_id.clone().and_then(|p| owned(Value::from(p))),
        );
        put(
            "xesam:title",
            s.title.clone().and_then(|t| owned(Value::from(t))),
        );
        if !s.artist.is_empty() {
            put("xesam:artist", owned(Value::from(s.artist.clone())));
        }
        put(
            "xesam:album",
            s.album.clone().and_then(|a| owned(Value::from(a))),
        );
        put("xesam:url", s.url.clone().and_then(|u| owned(Value::from(u))));
        put(
            "mpris:length",
            s.length_micros.and_then(|l| owned(Value::from(l))),
        );
        put(
            "mpris:artUrl",
            s.art_url.clone().and_then(|u| owned(Value::from(u))),
        );
        map
    }
}

async fn emit_changes(player: &InterfaceRef<PlayerIface>) {
    let emitter = player.signal_emitter();
    let iface = player.get().await;
    if let Err(e) = iface.playback_status_changed(emitter).await {
        debug!(error = %e, "failed to signal PlaybackStatus change");
    }
    if let Err(e) = iface.metadata_changed(emitter).await {
        debug!(error = %e, "failed to signal Metadata change");
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;
    let player = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    info!(name = BUS_NAME, "MPRIS service registered");

    loop {
        Timer::after(NOTIFY_POLL).await;
        let mut dirty = false;
        loop {
            match notify.try_recv() {
                Ok(()) => dirty = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if dirty {
            emit_changes(&player).await;
        }
    }
}

/// Register the player on the session bus from a background thread.
/// Failures are logged and the returned handle keeps working as a no-op.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
            warn!(error = %e, "MPRIS unavailable");
        }
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}
