//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::{App, PlaybackState, UiState, format_duration};
use crate::audio::PlaybackEngine;
use crate::config::{PlaybackSettings, TrackDisplayField, UiSettings};
use crate::library::Track;

const LEFT_PAD: Padding = Padding {
    left: 1,
    right: 0,
    top: 0,
    bottom: 0,
};

/// Render the controls help text, incorporating the seek steps.
fn controls_text(playback: &PlaybackSettings) -> String {
    let forward = playback.seek_forward_ms / 1000;
    let back = playback.seek_back_ms / 1000;
    [
        "[j/k] up/down".to_string(),
        "[h/l] prev/next song".to_string(),
        format!("[H/L] -{back}s/+{forward}s"),
        "[0-9] seek to %".to_string(),
        "[enter] play selected song".to_string(),
        "[space/p] play/pause".to_string(),
        "[s] stop".to_string(),
        "[gg/G] top/bottom".to_string(),
        "[zz] jump to playing".to_string(),
        "[K] metadata".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// Build the "now playing" text according to `ui` settings.
fn now_playing_text(track: &Track, ui: &UiSettings) -> String {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    let parts: Vec<String> = ui
        .now_playing_fields
        .iter()
        .filter_map(|f| match f {
            TrackDisplayField::Display => non_empty(&track.display),
            TrackDisplayField::Title => non_empty(&track.title),
            TrackDisplayField::Artist => track.artist.as_deref().and_then(non_empty),
            TrackDisplayField::Album => track.album.as_deref().and_then(non_empty),
            TrackDisplayField::Filename => non_empty(&track.display_name),
            TrackDisplayField::Path => Some(track.uri.display().to_string()),
        })
        .collect();

    if parts.is_empty() {
        track.display.clone()
    } else {
        parts.join(&ui.now_playing_separator)
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format an optional duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

fn status_text<E: PlaybackEngine>(app: &App<E>, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    let state = match (app.ui_state, app.playback_state()) {
        (UiState::Initial, _) if app.has_tracks() => "Loading",
        (_, PlaybackState::Playing) => "Playing",
        (_, PlaybackState::Paused) => "Paused",
        (_, PlaybackState::Stopped) => "Stopped",
    };
    parts.push(format!(" {state}"));

    if let Some(track) = &app.current {
        parts.push(format!("Song: {}", now_playing_text(track, ui)));
    }

    parts.push(format!("Tracks: {}", app.tracks.len()));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }

    if let Some(err) = &app.last_error {
        parts.push(format!("Error: {err}"));
    }

    parts.join(" • ")
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw<E: PlaybackEngine>(
    frame: &mut Frame,
    app: &App<E>,
    ui_settings: &UiSettings,
    playback_settings: &PlaybackSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tonearm ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_text(app, ui_settings))
        .block(Block::bordered().padding(LEFT_PAD).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    let label = format!(
        "{} / {}",
        app.progress_string,
        format_duration(app.duration)
    );
    let gauge = Gauge::default()
        .block(Block::bordered().title(" progress "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(app.progress.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, chunks[2]);

    // Main list: center the selection and only build the visible window.
    {
        let total = app.tracks.len();
        let list_height = chunks[3].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end) = if total <= list_height || list_height == 0 {
            (0, total)
        } else {
            let half = list_height / 2;
            let start = sel_pos.saturating_sub(half).min(total - list_height);
            (start, start + list_height)
        };
        let playing = app.current_index();

        let visible_items: Vec<ListItem> = app.tracks[start..end]
            .iter()
            .map(|t| {
                let item = ListItem::new(t.display.as_str());
                if playing == Some(t.index) {
                    item.bold()
                } else {
                    item
                }
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(sel_pos - start));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 9, chunks[3]);
        frame.render_widget(Clear, popup_area);

        let meta = match app.tracks.get(app.selected) {
            Some(track) => format!(
                "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nPath: {}",
                track.title,
                track.artist.as_deref().unwrap_or("-"),
                track.album.as_deref().unwrap_or("-"),
                format_duration_mmss_ceil(track.duration),
                track.uri.display()
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(LEFT_PAD)
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(playback_settings))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(LEFT_PAD),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
