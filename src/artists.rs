//! "My artists" and "top artists" panels.
//!
//! Each artist is enriched with its editorial "This Is <name>" and
//! "<name> Radio" playlists. One playlist search runs per artist, gated to
//! [`PLAYLIST_SEARCH_CONCURRENCY`] requests in flight.

use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::{
    error::{ApiError, FeatureError},
    recommend::{all_followed_artists, top_artists_extended},
    session::Session,
    spotify::TimeRange,
    state::{Feature, Snapshot},
    types::{Artist, SearchKind},
    utils::{first_image_url, is_spotify_owned, sort_key_without_the},
};

pub const PLAYLIST_SEARCH_CONCURRENCY: usize = 8;
const PLAYLIST_SEARCH_LIMIT: u32 = 20;
const TOP_ARTISTS_RANGE: TimeRange = TimeRange::MediumTerm;

const MISSING_NAME: &str = "N/A";
const MISSING_URI: &str = "spotify:";

#[derive(Debug, Clone, Serialize)]
pub struct ArtistEntry {
    pub name: String,
    pub uri: String,
    pub image: String,
    pub artist_playlist_name: String,
    pub artist_playlist: String,
    pub artist_radio_name: String,
    pub artist_radio: String,
}

async fn with_artist_playlists(
    session: &Session,
    gate: &Semaphore,
    artist: &Artist,
) -> Result<Option<ArtistEntry>, ApiError> {
    if artist.name.is_empty() {
        error!(id = %artist.id, "artist name missing");
        return Ok(None);
    }

    let this_is = format!("This Is {}", artist.name);
    let radio = format!("{} Radio", artist.name);

    let found = {
        let Ok(_permit) = gate.acquire().await else {
            return Ok(None);
        };
        session
            .client()
            .search(
                &artist.name.to_lowercase(),
                &[SearchKind::Playlist],
                PLAYLIST_SEARCH_LIMIT,
                session.market(),
            )
            .await?
    };

    let mut entry = ArtistEntry {
        name: artist.name.clone(),
        uri: artist.uri.clone(),
        image: first_image_url(&artist.images),
        artist_playlist_name: MISSING_NAME.to_string(),
        artist_playlist: MISSING_URI.to_string(),
        artist_radio_name: MISSING_NAME.to_string(),
        artist_radio: MISSING_URI.to_string(),
    };

    let playlists = found.playlists.map(|p| p.items).unwrap_or_default();
    for playlist in playlists.iter().filter(|p| is_spotify_owned(&p.owner)) {
        if playlist.name == this_is {
            entry.artist_playlist_name = playlist.name.clone();
            entry.artist_playlist = playlist.uri.clone();
        } else if playlist.name == radio {
            entry.artist_radio_name = playlist.name.clone();
            entry.artist_radio = playlist.uri.clone();
        }
    }

    Ok(Some(entry))
}

/// Enriches every artist, sorted by name ignoring a leading "The ".
pub async fn enrich_artists(
    session: &Session,
    artists: &[Artist],
) -> Result<Vec<ArtistEntry>, FeatureError> {
    let gate = Semaphore::new(PLAYLIST_SEARCH_CONCURRENCY);
    let results = join_all(
        artists
            .iter()
            .map(|artist| with_artist_playlists(session, &gate, artist)),
    )
    .await;

    let mut entries = Vec::with_capacity(results.len());
    for result in results {
        if let Some(entry) = result? {
            entries.push(entry);
        }
    }

    entries.sort_by_key(|e| sort_key_without_the(&e.name));
    Ok(entries)
}

pub async fn my_artists(session: &Session) -> Result<Snapshot, FeatureError> {
    let artists = all_followed_artists(session.client().as_ref()).await?;
    let entries = enrich_artists(session, &artists).await?;
    debug!(count = entries.len(), "my artists retrieved and sorted");

    Ok(Snapshot::new(
        Feature::MyArtists,
        format!("{} Artists", entries.len()),
        json!({ "my_artists": entries }),
    ))
}

pub async fn top_artists(session: &Session) -> Result<Snapshot, FeatureError> {
    let artists = top_artists_extended(session.client().as_ref(), TOP_ARTISTS_RANGE).await?;
    let entries = enrich_artists(session, &artists).await?;
    debug!(count = entries.len(), "top artists retrieved and sorted");

    Ok(Snapshot::new(
        Feature::TopArtists,
        format!("{} Artists", entries.len()),
        json!({ "top_artists": entries }),
    ))
}
