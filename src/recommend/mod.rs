//! # Recommendation / playlist builder
//!
//! Builds a set of recommended tracks for the account and optionally writes
//! them into a named playlist and starts playback.
//!
//! Without explicit seeds the builder samples the user's own listening:
//!
//! ```text
//! top tracks (99) ─┐            ┌─ recs(artists[..5])  ─┐
//!                  ├─ sample ───┼─ recs(artists[5..])  ─┼─ dedup ─ top-up ─ sample(count) ─ shuffle
//! artist pool ─────┘            └─ recs(tracks)        ─┘
//! ```
//!
//! With seeds a single recommendation request carries exactly those seeds.
//! The numeric target ranges ([`tuning`]) are shared by every request.

pub mod tuning;

use std::collections::BTreeSet;

use chrono::Local;
use rand::{rngs::StdRng, seq::IndexedRandom, seq::SliceRandom};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::{
    error::{ApiError, FeatureError},
    session::Session,
    spotify::{MAX_PAGE_SIZE, MAX_PLAYLIST_BATCH, RecommendationQuery, SpotifyApi, TimeRange},
    state::{Feature, Snapshot},
    types::{Artist, PlaybackRequest, Playlist, PlaylistDetails, Recommendations, Track},
    utils::dedup_by_key,
};

pub use tuning::{Attribute, Range, Targets, derive_range};

pub const DEFAULT_PLAYLIST_NAME: &str = "Spotify Plus";
/// Playlist id reported when the tracks were not written to a playlist.
pub const QUEUE_ONLY: &str = "Queue Only";
pub const RECOMMENDATION_LIMIT: u32 = 100;

const ARTIST_SAMPLE: usize = 10;
const TRACK_SAMPLE: usize = 5;
const SEEDS_PER_REQUEST: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MusicMachineRequest {
    /// Falls back to the configured tolerance.
    pub tolerance_percent: Option<f64>,
    pub name: String,
    /// Falls back to the configured track count.
    pub count: Option<usize>,
    /// Build from followed artists instead of top artists.
    pub focus: bool,
    pub time_range: TimeRange,
    pub play_now: bool,
    pub create_playlist: bool,
    pub device_name: Option<String>,
    pub seed_artists: Vec<String>,
    pub seed_genres: Vec<String>,
    pub seed_tracks: Vec<String>,
    pub targets: Targets,
}

impl Default for MusicMachineRequest {
    fn default() -> Self {
        Self {
            tolerance_percent: None,
            name: DEFAULT_PLAYLIST_NAME.to_string(),
            count: None,
            focus: false,
            time_range: TimeRange::LongTerm,
            play_now: false,
            create_playlist: true,
            device_name: None,
            seed_artists: Vec::new(),
            seed_genres: Vec::new(),
            seed_tracks: Vec::new(),
            targets: Targets::default(),
        }
    }
}

impl MusicMachineRequest {
    pub fn has_seeds(&self) -> bool {
        !(self.seed_artists.is_empty() && self.seed_genres.is_empty() && self.seed_tracks.is_empty())
    }
}

/// Splits a comma separated seed list, ignoring all whitespace.
pub fn parse_seeds(raw: &str) -> Vec<String> {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tracks chosen by one builder run, before any playlist is touched.
#[derive(Debug, Clone, Default)]
struct Selection {
    uris: Vec<String>,
    artist_names: Vec<String>,
    track_names: Vec<String>,
    genres: Vec<String>,
    seed_details: Value,
}

fn uris_of(recs: &Recommendations) -> Vec<String> {
    recs.tracks
        .iter()
        .filter(|t| !t.uri.is_empty())
        .map(|t| t.uri.clone())
        .collect()
}

fn sample<'a, T>(pool: &'a [T], k: usize, rng: &mut StdRng) -> Result<Vec<&'a T>, FeatureError> {
    if pool.len() < k {
        return Err(FeatureError::InsufficientCandidates {
            needed: k,
            available: pool.len(),
        });
    }
    Ok(pool.choose_multiple(rng, k).collect())
}

/// Up to 99 top tracks by requesting 49 at offset 0 and 50 at offset 49.
pub async fn top_tracks_extended(
    client: &dyn SpotifyApi,
    time_range: TimeRange,
) -> Result<Vec<Track>, ApiError> {
    let (first, second) = tokio::try_join!(
        client.top_tracks(MAX_PAGE_SIZE - 1, 0, time_range),
        client.top_tracks(MAX_PAGE_SIZE, MAX_PAGE_SIZE - 1, time_range),
    )?;
    let mut tracks: Vec<Track> = first.items.into_iter().chain(second.items).collect();
    dedup_by_key(&mut tracks, |t| t.id.clone());
    Ok(tracks)
}

/// Up to 99 top artists, same paging as [`top_tracks_extended`].
pub async fn top_artists_extended(
    client: &dyn SpotifyApi,
    time_range: TimeRange,
) -> Result<Vec<Artist>, ApiError> {
    let (first, second) = tokio::try_join!(
        client.top_artists(MAX_PAGE_SIZE - 1, 0, time_range),
        client.top_artists(MAX_PAGE_SIZE, MAX_PAGE_SIZE - 1, time_range),
    )?;
    let mut artists: Vec<Artist> = first.items.into_iter().chain(second.items).collect();
    dedup_by_key(&mut artists, |a| a.id.clone());
    Ok(artists)
}

/// Every followed artist, following the cursor until the last page.
pub async fn all_followed_artists(client: &dyn SpotifyApi) -> Result<Vec<Artist>, ApiError> {
    let mut artists = Vec::new();
    let mut after = None;

    loop {
        let page = client.followed_artists(MAX_PAGE_SIZE, after).await?;
        let fetched = page.items.len();
        artists.extend(page.items);

        after = page.cursors.and_then(|c| c.after);
        if page.next.is_none() || after.is_none() || fetched == 0 {
            break;
        }
    }

    dedup_by_key(&mut artists, |a| a.id.clone());
    Ok(artists)
}

/// Finds a playlist of the current user by exact name across all pages.
pub async fn find_playlist_by_name(
    client: &dyn SpotifyApi,
    name: &str,
) -> Result<Option<Playlist>, ApiError> {
    let mut offset = 0;
    loop {
        let page = client.current_user_playlists(MAX_PAGE_SIZE, offset).await?;
        let fetched = page.items.len() as u32;
        if let Some(found) = page.items.into_iter().find(|p| p.name == name) {
            return Ok(Some(found));
        }
        if page.next.is_none() || fetched == 0 {
            return Ok(None);
        }
        offset += fetched;
    }
}

/// Uris of every item currently in a playlist.
pub async fn playlist_uris(client: &dyn SpotifyApi, id: &str) -> Result<Vec<String>, ApiError> {
    let mut uris = Vec::new();
    let mut offset = 0;
    loop {
        let page = client
            .playlist_items(id, MAX_PLAYLIST_BATCH as u32, offset, None)
            .await?;
        let fetched = page.items.len() as u32;
        uris.extend(
            page.items
                .into_iter()
                .filter_map(|item| item.track)
                .map(|t| t.uri)
                .filter(|uri| !uri.is_empty()),
        );
        if page.next.is_none() || fetched == 0 {
            return Ok(uris);
        }
        offset += fetched;
    }
}

/// Writes `uris` into the playlist called `name`, clearing it first when it
/// already exists. Returns the playlist uri.
async fn materialize_playlist(
    session: &Session,
    name: &str,
    uris: &[String],
) -> Result<String, ApiError> {
    let client = session.client().as_ref();
    let details = PlaylistDetails {
        name: name.to_string(),
        description: session.settings().playlist_description.clone(),
        public: false,
        collaborative: false,
    };

    match find_playlist_by_name(client, name).await? {
        Some(existing) => {
            let current = playlist_uris(client, &existing.id).await?;
            if !current.is_empty() {
                client.remove_playlist_items(&existing.id, &current).await?;
            }
            client.add_playlist_items(&existing.id, uris, None).await?;
            client.change_playlist_details(&existing.id, &details).await?;
            debug!(playlist = %existing.uri, cleared = current.len(), "playlist refilled");
            Ok(existing.uri)
        }
        None => {
            let created = client.create_playlist(session.user_id(), &details).await?;
            client.add_playlist_items(&created.id, uris, None).await?;
            debug!(playlist = %created.uri, "playlist created");
            Ok(created.uri)
        }
    }
}

async fn select_from_listening(
    session: &Session,
    request: &MusicMachineRequest,
    base: &RecommendationQuery,
    count: usize,
    rng: &mut StdRng,
) -> Result<Selection, FeatureError> {
    let client = session.client().as_ref();

    let artist_pool = async {
        if request.focus {
            all_followed_artists(client).await
        } else {
            top_artists_extended(client, request.time_range).await
        }
    };
    let (tracks, artists) = tokio::try_join!(
        top_tracks_extended(client, request.time_range),
        artist_pool
    )?;
    debug!(
        tracks = tracks.len(),
        artists = artists.len(),
        "candidate pools fetched"
    );

    let sampled_tracks = sample(&tracks, TRACK_SAMPLE, rng)?;
    let sampled_artists = sample(&artists, ARTIST_SAMPLE, rng)?;

    let genres: BTreeSet<String> = sampled_artists
        .iter()
        .flat_map(|a| a.genres.iter().cloned())
        .collect();

    let artist_ids: Vec<String> = sampled_artists.iter().map(|a| a.id.clone()).collect();
    let (first_half, second_half) = artist_ids.split_at(SEEDS_PER_REQUEST);

    let mut by_first = base.clone();
    by_first.seed_artists = first_half.to_vec();
    let mut by_second = base.clone();
    by_second.seed_artists = second_half.to_vec();
    let mut by_tracks = base.clone();
    by_tracks.seed_tracks = sampled_tracks.iter().map(|t| t.id.clone()).collect();

    let (recs1, recs2, recs3) = tokio::try_join!(
        client.recommendations(&by_first),
        client.recommendations(&by_second),
        client.recommendations(&by_tracks),
    )?;

    let mut uris = uris_of(&recs1);
    uris.extend(uris_of(&recs2));
    dedup_by_key(&mut uris, |u| u.clone());

    if uris.len() < count / 2 {
        let mut extra = uris_of(&recs3);
        extra.shuffle(rng);
        uris.extend(extra.into_iter().take(count / 4));
        dedup_by_key(&mut uris, |u| u.clone());
    }

    Ok(Selection {
        uris,
        artist_names: sampled_artists.iter().map(|a| a.name.clone()).collect(),
        track_names: sampled_tracks.iter().map(|t| t.name.clone()).collect(),
        genres: genres.into_iter().collect(),
        seed_details: json!({
            "Recs1": recs1.seeds,
            "Recs2": recs2.seeds,
            "Recs3": recs3.seeds,
        }),
    })
}

async fn select_from_seeds(
    session: &Session,
    request: &MusicMachineRequest,
    base: &RecommendationQuery,
) -> Result<Selection, FeatureError> {
    let client = session.client().as_ref();

    let artist_names = async {
        if request.seed_artists.is_empty() {
            Ok(Vec::new())
        } else {
            client.artists(&request.seed_artists).await
        }
    };
    let track_names = async {
        if request.seed_tracks.is_empty() {
            Ok(Vec::new())
        } else {
            client.tracks(&request.seed_tracks).await
        }
    };
    let (artists, tracks) = tokio::try_join!(artist_names, track_names)?;

    let mut query = base.clone();
    query.seed_artists = request.seed_artists.clone();
    query.seed_genres = request.seed_genres.clone();
    query.seed_tracks = request.seed_tracks.clone();
    debug!(?query, "seeded recommendation request");

    let recs = client.recommendations(&query).await?;
    let mut uris = uris_of(&recs);
    dedup_by_key(&mut uris, |u| u.clone());

    Ok(Selection {
        uris,
        artist_names: artists.into_iter().map(|a| a.name).collect(),
        track_names: tracks.into_iter().map(|t| t.name).collect(),
        genres: request.seed_genres.clone(),
        seed_details: json!({ "Recs": recs.seeds }),
    })
}

/// Runs the builder and returns the summary snapshot.
///
/// A failure while writing the playlist is logged and reported as
/// `"Playlist ID": "Queue Only"`; the summary is still produced. Playback
/// failures are returned to the caller.
pub async fn build(
    session: &Session,
    request: MusicMachineRequest,
    rng: &mut StdRng,
) -> Result<Snapshot, FeatureError> {
    let client = session.client().as_ref();
    let settings = session.settings();
    let tolerance = request
        .tolerance_percent
        .unwrap_or(settings.tolerance_percent);
    let count = request.count.unwrap_or(settings.track_count);
    if count == 0 {
        return Err(FeatureError::InvalidInput(
            "track count must be at least 1".to_string(),
        ));
    }
    let started = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    if let Some(device_name) = request.device_name.as_deref() {
        match session.devices().find_by_name(device_name).and_then(|d| d.id) {
            Some(device_id) => {
                if let Err(e) = client.transfer_playback(&device_id, true).await {
                    error!(device = device_name, error = %e, "playback transfer failed");
                }
            }
            None => warn!(device = device_name, "device not found, skipping transfer"),
        }
    }

    let base = RecommendationQuery {
        limit: RECOMMENDATION_LIMIT,
        market: session.market().map(str::to_string),
        bounds: tuning::tuning_bounds(&request.targets, tolerance),
        ..Default::default()
    };

    let selection = if request.has_seeds() {
        select_from_seeds(session, &request, &base).await?
    } else {
        select_from_listening(session, &request, &base, count, rng).await?
    };

    let mut uris: Vec<String> = selection
        .uris
        .choose_multiple(rng, selection.uris.len().min(count))
        .cloned()
        .collect();
    uris.shuffle(rng);
    debug!(tracks = uris.len(), "recommended tracks selected");

    let mut playlist_name = request.name.clone();
    let mut playlist_uri = None;
    if request.create_playlist {
        match materialize_playlist(session, &request.name, &uris).await {
            Ok(uri) => playlist_uri = Some(uri),
            Err(e) => error!(playlist = %request.name, error = %e, "playlist creation failure"),
        }
    }

    if request.play_now {
        let mut playback = PlaybackRequest::default();
        match (&playlist_uri, request.create_playlist) {
            (Some(uri), true) => playback.context_uri = Some(uri.clone()),
            (_, create) => {
                if !create {
                    playlist_name = QUEUE_ONLY.to_string();
                }
                playback.uris = Some(uris.clone());
            }
        }
        client.start_playback(&playback).await?;
    }

    let attributes = json!({
        "Playlist Name": playlist_name,
        "Playlist ID": playlist_uri.as_deref().unwrap_or(QUEUE_ONLY),
        "Number of Tracks": uris.len(),
        "Artists": selection.artist_names,
        "Tracks": selection.track_names,
        "Genres": selection.genres,
        "Stats": tuning::stats(&base),
        "Seed Details": selection.seed_details,
        "Track URIs": uris,
    });

    Ok(Snapshot::new(Feature::MusicMachine, started, attributes))
}
