use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use tracing::debug;

use crate::app::{App, UiEvent};
use crate::artwork::ArtworkLoader;
use crate::audio::PlaybackEngine;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::MprisSync;
use crate::runtime::startup::Tui;
use crate::ui;

const INPUT_POLL: Duration = Duration::from_millis(50);

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
    mpris: MprisSync,
}

/// Main terminal event loop: applies playback statuses, draws the UI and
/// handles input and MPRIS commands. Returns `Ok(())` when shutdown is
/// requested.
pub fn run<E: PlaybackEngine>(
    terminal: &mut Tui,
    settings: &config::Settings,
    app: &mut App<E>,
    mpris: &MprisHandle,
    artwork: Option<&ArtworkLoader>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.sync_status();
        state.mpris.sync(mpris, artwork, app);

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.playback))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app) {
                return Ok(());
            }
        }

        // Polling blocks; keep it off the runtime's scheduler.
        if tokio::task::block_in_place(|| event::poll(INPUT_POLL))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, app, state) {
                    return Ok(());
                }
            }
        }
    }
}

/// Apply a desktop media command. Returns `true` when the app should quit.
fn handle_control_cmd<E: PlaybackEngine>(cmd: ControlCmd, app: &mut App<E>) -> bool {
    debug!(?cmd, "mpris command");
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if !app.is_playing {
                app.dispatch(UiEvent::PlayPause);
            }
        }
        ControlCmd::Pause => {
            if app.is_playing {
                app.dispatch(UiEvent::PlayPause);
            }
        }
        ControlCmd::PlayPause => app.dispatch(UiEvent::PlayPause),
        ControlCmd::Stop => app.dispatch(UiEvent::Stop),
        ControlCmd::Next => app.dispatch(UiEvent::SeekToNext),
        ControlCmd::Prev => app.dispatch(UiEvent::SeekToPrevious),
    }
    false
}

/// Apply a key press. Returns `true` when the app should quit.
fn handle_key_event<E: PlaybackEngine>(
    key: KeyEvent,
    app: &mut App<E>,
    state: &mut EventLoopState,
) -> bool {
    let gg = std::mem::take(&mut state.pending_gg);
    let zz = std::mem::take(&mut state.pending_zz);

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if gg {
                app.set_selected(0);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.set_selected(usize::MAX),
        KeyCode::Char('z') => {
            if zz {
                if let Some(i) = app.current_index() {
                    app.set_selected(i);
                }
            } else {
                state.pending_zz = true;
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => {
            if app.has_tracks() {
                app.dispatch(UiEvent::SelectedAudioChange(app.selected));
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => app.dispatch(UiEvent::PlayPause),
        KeyCode::Char('s') => app.dispatch(UiEvent::Stop),
        KeyCode::Char('l') => app.dispatch(UiEvent::SeekToNext),
        KeyCode::Char('h') => app.dispatch(UiEvent::SeekToPrevious),
        KeyCode::Char('L') | KeyCode::Right => app.dispatch(UiEvent::Forward),
        KeyCode::Char('H') | KeyCode::Left => app.dispatch(UiEvent::Backward),
        KeyCode::Char(c @ '0'..='9') => {
            let tenths = c as u8 - b'0';
            app.dispatch(UiEvent::SeekTo(tenths * 10));
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }
    false
}
