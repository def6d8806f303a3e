//! History playlist: keeps the current track at the top of a dedicated
//! playlist and reports play counts per artist.

use std::collections::HashMap;

use chrono::Local;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use crate::{
    error::{ApiError, FeatureError},
    session::Session,
    state::{Feature, Snapshot},
    types::PlaylistItem,
};

const ADDED_AT_FORMAT: &str = "%m-%d-%Y %H:%M:%S";
const ITEMS_PAGE_SIZE: u32 = 100;
const MIN_PLAYLIST_ID_LEN: usize = 5;
pub const INVALID_PLAYLIST_STATE: &str = "Playlist not defined or invalid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistPlays {
    pub name: String,
    pub plays: usize,
}

/// Moves the currently playing track to position 0 of the history playlist.
///
/// A failed remove/insert is logged and `previous_state` is kept, but the
/// playlist metadata is still refreshed.
pub async fn add_to_history(
    session: &Session,
    previous_state: &str,
) -> Result<Snapshot, FeatureError> {
    let playlist_id = session
        .settings()
        .history_playlist_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(FeatureError::NotConfigured("history playlist"))?;

    let client = session.client();
    let track = client
        .currently_playing(session.market())
        .await?
        .and_then(|p| p.item)
        .ok_or_else(|| FeatureError::InvalidInput("nothing is playing".to_string()))?;

    let added_at = Local::now().format(ADDED_AT_FORMAT).to_string();
    let uris = vec![track.uri.clone()];

    let moved: Result<(), ApiError> = async {
        client.remove_playlist_items(playlist_id, &uris).await?;
        client.add_playlist_items(playlist_id, &uris, Some(0)).await
    }
    .await;

    let state = match moved {
        Ok(()) => {
            debug!(track = %track.name, "track added to history");
            format!("Added {}", track.name)
        }
        Err(e) => {
            error!(error = %e, "history playlist update failed");
            previous_state.to_string()
        }
    };

    let playlist = client.playlist(playlist_id).await?;

    Ok(Snapshot::new(
        Feature::AddToHistory,
        state,
        json!({
            "Added at": added_at,
            "Song Count": playlist.tracks.total,
            "Playlist Image": playlist.images,
        }),
    ))
}

async fn all_items(session: &Session, playlist_id: &str) -> Result<Vec<PlaylistItem>, ApiError> {
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = session
            .client()
            .playlist_items(playlist_id, ITEMS_PAGE_SIZE, offset, session.market())
            .await?;
        let fetched = page.items.len() as u32;
        items.extend(page.items);

        if page.next.is_none() || fetched == 0 {
            break;
        }
        offset += fetched;
    }

    Ok(items)
}

/// Play counts per artist name. Returns the number of unique artists and
/// the artists seen more than once, most played first.
pub fn count_artist_plays(items: &[PlaylistItem]) -> (usize, Vec<ArtistPlays>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for track in items.iter().filter_map(|i| i.track.as_ref()) {
        for artist in &track.artists {
            *counts.entry(artist.name.as_str()).or_default() += 1;
        }
    }

    let unique = counts.len();
    let mut repeated: Vec<ArtistPlays> = counts
        .into_iter()
        .filter(|(_, plays)| *plays > 1)
        .map(|(name, plays)| ArtistPlays {
            name: name.to_string(),
            plays,
        })
        .collect();
    repeated.sort_by(|a, b| b.plays.cmp(&a.plays).then_with(|| a.name.cmp(&b.name)));

    (unique, repeated)
}

pub async fn history_analysis(session: &Session) -> Result<Snapshot, FeatureError> {
    let playlist_id = session
        .settings()
        .history_playlist_id
        .as_deref()
        .unwrap_or_default();

    if playlist_id.len() < MIN_PLAYLIST_ID_LEN {
        return Ok(Snapshot::new(
            Feature::HistoryAnalysis,
            INVALID_PLAYLIST_STATE,
            json!({}),
        ));
    }

    let items = all_items(session, playlist_id).await?;
    let (unique, artists) = count_artist_plays(&items);
    debug!(unique, repeated = artists.len(), "history analysed");

    Ok(Snapshot::new(
        Feature::HistoryAnalysis,
        unique.to_string(),
        json!({ "artists": artists }),
    ))
}
