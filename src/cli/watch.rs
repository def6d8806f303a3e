use std::sync::Arc;

use crate::{
    cli::runtime,
    info,
    player::PlaybackMirror,
    state::Feature,
    success, warning,
};

/// Mirrors playback until Ctrl-C, printing every state change.
pub async fn watch() {
    let rt = runtime::connect().await;
    let session = Arc::clone(rt.dispatcher.session());
    let board = Arc::clone(rt.dispatcher.board());
    let settings = session.settings().clone();

    let devices = session.spawn_device_polling(settings.device_poll_interval);
    let mirror = PlaybackMirror::new(Arc::clone(&session), Arc::clone(&board));
    let poller = tokio::spawn(mirror.run(settings.playback_poll_interval));

    info!(
        "Watching playback every {}s, devices every {}s. Press Ctrl-C to stop.",
        settings.playback_poll_interval.as_secs(),
        settings.device_poll_interval.as_secs()
    );

    let mut updates = board.subscribe(Feature::Player);
    let mut last_line = String::new();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&updates.borrow_and_update());
                let title = snapshot
                    .attribute("media_title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let source = snapshot
                    .attribute("source")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let line = format!("{} | {} | {}", snapshot.state, title, source);
                if line != last_line {
                    info!("{}", line);
                    last_line = line;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.abort();
    devices.abort();

    let last = board.current(Feature::Player);
    if let Err(e) = rt.store.persist(&last).await {
        warning!("Failed to store player state: {}", e);
    }
    success!("Stopped watching.");
}
