use std::env;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use tracing::{info, warn};

use crate::app::App;
use crate::audio::RodioEngine;
use crate::library::LocalLibrary;
use crate::logging;
use crate::mpris::ControlCmd;
use crate::service::AudioServiceHandler;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;

/// Composition root: wires the engine, playback service, view-model, MPRIS
/// and terminal together, then runs the UI until quit.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, warning) = settings::load_settings();
    let log_path = logging::init(&settings.log);
    if let Some(msg) = warning {
        warn!("{msg}");
    }
    info!(log = ?log_path, "starting tonearm");

    let dir = startup::library_dir(env::args().nth(1), &settings.library);

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = Arc::new(RodioEngine::new(&settings.playback, events_tx)?);
    let service = Arc::new(AudioServiceHandler::new(
        engine.clone(),
        Duration::from_millis(settings.playback.progress_interval_ms),
    ));
    let pump = tokio::spawn({
        let service = service.clone();
        async move { service.pump_engine_events(events_rx).await }
    });

    let mut app = App::new(service);
    app.set_current_dir(dir.display().to_string());
    let library = LocalLibrary::new(dir.clone(), settings.library.clone());
    match app.load(&library).await {
        Ok(count) => info!(count, dir = %dir.display(), "library loaded"),
        Err(e) => {
            warn!(error = %e, "failed to load library");
            app.last_error = Some(e.to_string());
        }
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);
    mpris_sync::update_mpris(&mpris, &app);
    let artwork = startup::artwork_loader(&settings.artwork);

    let mut terminal = startup::enter_terminal()?;
    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        &settings,
        &mut app,
        &mpris,
        artwork.as_ref(),
        &control_rx,
        &mut state,
    );
    startup::leave_terminal(&mut terminal)?;

    let fade_out = Duration::from_millis(settings.playback.quit_fade_out_ms);
    tokio::task::block_in_place(|| engine.shutdown(fade_out));
    // The audio thread has exited, so the event stream is closed.
    let _ = pump.await;
    info!("bye");

    run_result
}
