//! Queue and recently played panel.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::{
    error::FeatureError,
    session::Session,
    state::{Feature, Snapshot},
    types::Track,
    utils::first_image_url,
};

pub const RECENT_LIMIT: u32 = 30;
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub trackname: String,
    pub trackartist: String,
    pub trackuri: String,
    pub trackid: String,
    pub image: String,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEntry {
    pub trackname: String,
    pub trackartist: String,
    pub trackuri: String,
    pub image: String,
    pub played: String,
    pub saved: bool,
}

fn artist_name(track: &Track) -> String {
    track
        .artists
        .first()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| track.show.as_ref().map(|s| s.name.clone()).unwrap_or_default())
}

fn track_image(track: &Track) -> String {
    if track.album.images.is_empty() {
        first_image_url(&track.images)
    } else {
        first_image_url(&track.album.images)
    }
}

/// One bulk saved-check for `tracks`. Failures leave every flag false.
async fn saved_flags(session: &Session, tracks: &[&Track]) -> Vec<bool> {
    let ids: Vec<String> = tracks
        .iter()
        .filter(|t| !t.id.is_empty())
        .map(|t| t.id.clone())
        .collect();
    if ids.is_empty() {
        return vec![false; tracks.len()];
    }

    let flags = match session.client().saved_tracks_contains(&ids).await {
        Ok(flags) => flags,
        Err(e) => {
            error!(error = %e, "saved track check failed");
            Vec::new()
        }
    };

    let mut flags = flags.into_iter();
    tracks
        .iter()
        .map(|t| !t.id.is_empty() && flags.next().unwrap_or(false))
        .collect()
}

pub async fn queue_and_recent(session: &Session) -> Result<Snapshot, FeatureError> {
    sleep(SETTLE_DELAY).await;

    let client = session.client();
    let (queue, recent) = tokio::join!(client.queue(), client.recently_played(RECENT_LIMIT));

    let queue = queue.map(|q| q.queue).unwrap_or_else(|e| {
        error!(error = %e, "queue unavailable");
        Vec::new()
    });
    let recent = recent.map(|r| r.items).unwrap_or_else(|e| {
        error!(error = %e, "recently played unavailable");
        Vec::new()
    });
    debug!(queue = queue.len(), recent = recent.len(), "queue and recent fetched");

    let queue_refs: Vec<&Track> = queue.iter().collect();
    let recent_refs: Vec<&Track> = recent.iter().map(|h| &h.track).collect();
    let (queue_saved, recent_saved) = tokio::join!(
        saved_flags(session, &queue_refs),
        saved_flags(session, &recent_refs)
    );

    let queue: Vec<QueueEntry> = queue
        .iter()
        .zip(queue_saved)
        .map(|(track, saved)| QueueEntry {
            trackname: track.name.clone(),
            trackartist: artist_name(track),
            trackuri: track.uri.clone(),
            trackid: track.id.clone(),
            image: track_image(track),
            saved,
        })
        .collect();

    let recent: Vec<RecentEntry> = recent
        .iter()
        .zip(recent_saved)
        .map(|(history, saved)| RecentEntry {
            trackname: history.track.name.clone(),
            trackartist: artist_name(&history.track),
            trackuri: history.track.uri.clone(),
            image: track_image(&history.track),
            played: history.played_at.clone(),
            saved,
        })
        .collect();

    Ok(Snapshot::new(
        Feature::Extras,
        "Queue and Recent",
        json!({ "queue": queue, "recent": recent }),
    ))
}
