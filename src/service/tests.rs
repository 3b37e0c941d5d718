use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::*;
use crate::audio::fake::{EngineCall, FakeEngine};
use crate::audio::{EngineEvent, EngineState, MediaItem, PlaybackEngine};

const INTERVAL: Duration = Duration::from_millis(500);

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn setup(queue_len: usize) -> (Arc<FakeEngine>, AudioServiceHandler<FakeEngine>) {
    let engine = Arc::new(FakeEngine::with_queue(queue_len));
    engine.set(|s| {
        s.duration = secs(200);
        s.position = secs(7);
    });
    let handler = AudioServiceHandler::new(engine.clone(), INTERVAL);
    (engine, handler)
}

fn drain(rx: &mut broadcast::Receiver<AudioState>) -> Vec<AudioState> {
    let mut out = Vec::new();
    while let Ok(s) = rx.try_recv() {
        out.push(s);
    }
    out
}

fn progress_count(states: &[AudioState]) -> usize {
    states
        .iter()
        .filter(|s| matches!(s, AudioState::Progress(_)))
        .count()
}

fn item(name: &str) -> MediaItem {
    MediaItem {
        uri: format!("/music/{name}.mp3").into(),
        duration: None,
    }
}

#[tokio::test]
async fn submit_queue_replaces_and_prepares() {
    let (engine, handler) = setup(0);
    handler.submit_queue(vec![item("a"), item("b")]);

    assert_eq!(
        engine.calls(),
        vec![EngineCall::SetQueue(2), EngineCall::Prepare]
    );
    assert_eq!(engine.media_item_count(), 2);
}

#[tokio::test]
async fn selecting_past_the_end_is_an_invalid_selection() {
    let (engine, handler) = setup(0);
    handler.submit_queue(vec![item("a"), item("b"), item("c")]);
    engine.clear_calls();
    let mut rx = handler.subscribe();

    let err = handler
        .handle_command(PlayerEvent::SelectTrack(3))
        .unwrap_err();

    assert_eq!(err, ServiceError::InvalidSelection { index: 3, len: 3 });
    assert!(engine.calls().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn selecting_the_current_track_toggles_instead_of_seeking() {
    let (engine, handler) = setup(3);
    engine.set(|s| {
        s.index = Some(1);
        s.playing = true;
    });
    let mut rx = handler.subscribe();

    handler.handle_command(PlayerEvent::SelectTrack(1)).unwrap();

    assert_eq!(engine.calls(), vec![EngineCall::Pause]);
    assert_eq!(drain(&mut rx), vec![AudioState::Playing(false)]);
}

#[tokio::test]
async fn selecting_another_track_seeks_and_forces_playback() {
    let (engine, handler) = setup(3);
    let mut rx = handler.subscribe();

    handler.handle_command(PlayerEvent::SelectTrack(2)).unwrap();

    assert_eq!(
        engine.calls(),
        vec![EngineCall::SeekToDefaultPosition(2), EngineCall::Play]
    );
    assert_eq!(
        drain(&mut rx),
        vec![AudioState::Playing(true), AudioState::CurrentTrack(2)]
    );
    assert!(handler.sampler_running());
}

#[tokio::test]
async fn seek_to_fraction_scales_duration_and_clamps() {
    let (engine, handler) = setup(1);

    handler
        .handle_command(PlayerEvent::SeekToFraction(0.25))
        .unwrap();
    handler
        .handle_command(PlayerEvent::SeekToFraction(1.5))
        .unwrap();
    handler
        .handle_command(PlayerEvent::SeekToFraction(-1.0))
        .unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::SeekTo(secs(50)),
            EngineCall::SeekTo(secs(200)),
            EngineCall::SeekTo(Duration::ZERO),
        ]
    );
}

#[tokio::test]
async fn seek_to_fraction_rejects_nan() {
    let (engine, handler) = setup(1);
    let err = handler
        .handle_command(PlayerEvent::SeekToFraction(f32::NAN))
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidFraction(_)));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn transport_commands_map_to_engine_calls() {
    let (engine, handler) = setup(2);
    for cmd in [
        PlayerEvent::Forward,
        PlayerEvent::Backward,
        PlayerEvent::SeekToNext,
        PlayerEvent::SeekToPrevious,
        PlayerEvent::SeekTo(secs(42)),
    ] {
        handler.handle_command(cmd).unwrap();
    }
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::SeekForward,
            EngineCall::SeekBack,
            EngineCall::SeekToNext,
            EngineCall::SeekToPrevious,
            EngineCall::SeekTo(secs(42)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn toggling_play_pause_drives_status_and_progress() {
    let (_engine, handler) = setup(3);
    let mut rx = handler.subscribe();

    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    assert_eq!(drain(&mut rx), vec![AudioState::Playing(true)]);

    tokio::time::sleep(Duration::from_millis(510)).await;
    assert_eq!(drain(&mut rx), vec![AudioState::Progress(secs(7))]);
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(drain(&mut rx), vec![AudioState::Progress(secs(7))]);

    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    assert_eq!(drain(&mut rx), vec![AudioState::Playing(false)]);
    assert!(!handler.sampler_running());

    tokio::time::sleep(secs(3)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn rapid_toggles_leave_a_single_sampler() {
    let (_engine, handler) = setup(3);
    let mut rx = handler.subscribe();

    for _ in 0..4 {
        handler.handle_command(PlayerEvent::PlayPause).unwrap();
    }
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    drain(&mut rx);

    tokio::time::sleep(Duration::from_millis(510)).await;
    assert_eq!(progress_count(&drain(&mut rx)), 1);
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(progress_count(&drain(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn restarting_the_sampler_cancels_the_previous_one() {
    let (_engine, handler) = setup(3);
    let mut rx = handler.subscribe();

    // play at t=0, pause at t=200, play again at t=300
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    drain(&mut rx);

    // Only the sampler started at t=300 may tick (at t=800).
    tokio::time::sleep(Duration::from_millis(510)).await;
    assert_eq!(progress_count(&drain(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn engine_playing_callbacks_start_and_stop_sampling() {
    let (engine, handler) = setup(3);
    engine.set(|s| s.index = Some(2));
    let mut rx = handler.subscribe();

    handler.on_is_playing_changed(true);
    assert_eq!(
        drain(&mut rx),
        vec![AudioState::Playing(true), AudioState::CurrentTrack(2)]
    );
    assert!(handler.sampler_running());

    handler.on_is_playing_changed(false);
    assert_eq!(
        drain(&mut rx),
        vec![
            AudioState::Playing(false),
            AudioState::CurrentTrack(2),
            AudioState::Playing(false),
        ]
    );
    assert!(!handler.sampler_running());

    tokio::time::sleep(secs(2)).await;
    assert_eq!(progress_count(&drain(&mut rx)), 0);
}

#[tokio::test]
async fn playback_state_changes_map_to_buffering_and_ready() {
    let (_engine, handler) = setup(1);
    let mut rx = handler.subscribe();

    handler.on_playback_state_changed(EngineState::Buffering);
    handler.on_playback_state_changed(EngineState::Idle);
    handler.on_playback_state_changed(EngineState::Ready);
    handler.on_playback_state_changed(EngineState::Ended);

    assert_eq!(
        drain(&mut rx),
        vec![AudioState::Buffering(secs(7)), AudioState::Ready(secs(200))]
    );
    assert_eq!(handler.state(), AudioState::Ready(secs(200)));
}

#[tokio::test]
async fn engine_errors_surface_as_failed_and_stop_sampling() {
    let (_engine, handler) = setup(1);
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    let mut rx = handler.subscribe();

    handler.handle_engine_event(EngineEvent::Error("bad codec".into()));

    assert_eq!(drain(&mut rx), vec![AudioState::Failed("bad codec".into())]);
    assert!(!handler.sampler_running());
}

#[tokio::test]
async fn stop_pauses_and_reports_not_playing() {
    let (engine, handler) = setup(1);
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    engine.clear_calls();
    let mut rx = handler.subscribe();

    handler.handle_command(PlayerEvent::Stop).unwrap();

    assert_eq!(engine.calls(), vec![EngineCall::Pause]);
    assert_eq!(drain(&mut rx), vec![AudioState::Playing(false)]);
    assert!(!handler.sampler_running());
}

#[tokio::test]
async fn pump_forwards_engine_events_in_order() {
    let (_engine, handler) = setup(1);
    let mut rx = handler.subscribe();
    let (tx, events) = tokio::sync::mpsc::unbounded_channel();

    tx.send(EngineEvent::PlaybackStateChanged(EngineState::Buffering))
        .unwrap();
    tx.send(EngineEvent::PlaybackStateChanged(EngineState::Ready))
        .unwrap();
    drop(tx);
    handler.pump_engine_events(events).await;

    assert_eq!(
        drain(&mut rx),
        vec![AudioState::Buffering(secs(7)), AudioState::Ready(secs(200))]
    );
}

#[tokio::test]
async fn item_transitions_announce_the_new_current_track() {
    let (_engine, handler) = setup(3);
    let mut rx = handler.subscribe();

    handler.handle_engine_event(EngineEvent::MediaItemTransition(1));
    handler.handle_engine_event(EngineEvent::PlaybackStateChanged(EngineState::Buffering));
    handler.handle_engine_event(EngineEvent::PlaybackStateChanged(EngineState::Ready));

    assert_eq!(
        drain(&mut rx),
        vec![
            AudioState::CurrentTrack(1),
            AudioState::Buffering(secs(7)),
            AudioState::Ready(secs(200)),
        ]
    );
    assert_eq!(handler.state(), AudioState::Ready(secs(200)));
}

#[tokio::test]
async fn stop_works_after_the_sampler_lock_was_poisoned() {
    let (_engine, handler) = setup(1);
    handler.handle_command(PlayerEvent::PlayPause).unwrap();
    assert!(handler.sampler_running());

    handler.poison_sampler_lock();
    handler.handle_command(PlayerEvent::Stop).unwrap();

    assert!(!handler.sampler_running());
}
