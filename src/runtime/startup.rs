use std::env;
use std::io::Stdout;
use std::path::PathBuf;

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::artwork::ArtworkLoader;
use crate::config::{self, ArtworkSettings, LibrarySettings};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Directory to play: the CLI argument, then `library.root`, then the
/// current directory.
pub fn library_dir(arg: Option<String>, settings: &LibrarySettings) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| settings.root.clone())
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"))
}

/// Artwork loader for the configured cache directory, if one can be resolved.
pub fn artwork_loader(settings: &ArtworkSettings) -> Option<ArtworkLoader> {
    let dir = settings
        .cache_dir
        .clone()
        .or_else(config::default_artwork_cache_dir);
    if dir.is_none() {
        debug!("no artwork cache directory, artwork disabled");
    }
    dir.map(|d| ArtworkLoader::new(d, settings.max_size))
}

pub fn enter_terminal() -> std::io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

pub fn leave_terminal(terminal: &mut Tui) -> std::io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
