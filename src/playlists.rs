//! The user's playlists with averaged audio features.

use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::{
    error::{ApiError, FeatureError},
    session::Session,
    state::{Feature, Snapshot},
    types::{AudioFeatures, Playlist},
    utils::first_image_url,
};

const PLAYLIST_PAGE_SIZE: u32 = 20;
const ANALYSED_ITEMS: u32 = 100;
const ANALYSIS_CONCURRENCY: usize = 8;
const DAILY_MIX: &str = "Daily Mix";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAnalysis {
    pub name: String,
    pub uri: String,
    pub image: String,
    pub owner: String,
    pub description: String,
    pub avg_energy: u32,
    pub avg_valence: u32,
    pub avg_acousticness: u32,
    pub avg_instrumentalness: u32,
    pub avg_liveness: u32,
    pub avg_speechiness: u32,
    pub avg_danceability: u32,
    pub avg_popularity: u32,
    pub tracks: usize,
}

/// Every non-empty playlist of the user, following `next` until exhausted.
pub async fn all_user_playlists(session: &Session) -> Result<Vec<Playlist>, ApiError> {
    let mut playlists = Vec::new();
    let mut offset = 0;

    loop {
        let page = session
            .client()
            .current_user_playlists(PLAYLIST_PAGE_SIZE, offset)
            .await?;
        let fetched = page.items.len() as u32;
        playlists.extend(page.items.into_iter().filter(|p| p.tracks.total != 0));

        if page.next.is_none() || fetched == 0 {
            break;
        }
        offset += fetched;
    }

    Ok(playlists)
}

fn percent_average(values: impl Iterator<Item = f64>, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let total: f64 = values.sum();
    (total / count as f64 * 100.0) as u32
}

/// Integer averages of the features on a 0-100 scale. Tracks without
/// features count as zero.
pub fn average_features(
    base: PlaylistAnalysis,
    features: &[Option<AudioFeatures>],
    popularity: &[u32],
) -> PlaylistAnalysis {
    let present: Vec<&AudioFeatures> = features.iter().flatten().collect();
    let n = features.len();
    let avg = |f: fn(&AudioFeatures) -> f64| percent_average(present.iter().map(|a| f(a)), n);

    let avg_popularity = if popularity.is_empty() {
        0
    } else {
        popularity.iter().sum::<u32>() / popularity.len() as u32
    };

    PlaylistAnalysis {
        avg_energy: avg(|a| a.energy),
        avg_valence: avg(|a| a.valence),
        avg_acousticness: avg(|a| a.acousticness),
        avg_instrumentalness: avg(|a| a.instrumentalness),
        avg_liveness: avg(|a| a.liveness),
        avg_speechiness: avg(|a| a.speechiness),
        avg_danceability: avg(|a| a.danceability),
        avg_popularity,
        tracks: n,
        ..base
    }
}

async fn analyse(
    session: &Session,
    gate: &Semaphore,
    playlist: &Playlist,
) -> Result<PlaylistAnalysis, ApiError> {
    let base = PlaylistAnalysis {
        name: playlist.name.clone(),
        uri: playlist.uri.clone(),
        image: first_image_url(&playlist.images),
        owner: playlist.owner.display_name.clone(),
        description: playlist.description.clone(),
        ..Default::default()
    };

    let Ok(_permit) = gate.acquire().await else {
        return Ok(base);
    };

    let client = session.client();
    let items = client
        .playlist_items(&playlist.id, ANALYSED_ITEMS, 0, session.market())
        .await?;

    let tracks: Vec<_> = items
        .items
        .into_iter()
        .filter_map(|i| i.track)
        .filter(|t| !t.id.is_empty())
        .collect();
    if tracks.is_empty() {
        debug!(playlist = %playlist.name, "no analysable tracks");
        return Ok(base);
    }

    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let popularity: Vec<u32> = tracks.iter().map(|t| t.popularity).collect();
    let features = match client.audio_features(&ids).await {
        Ok(features) => features,
        Err(e) => {
            warn!(playlist = %playlist.name, error = %e, "audio features unavailable");
            vec![None; ids.len()]
        }
    };

    Ok(average_features(base, &features, &popularity))
}

/// "Daily Mix" playlists first, then everything else, each group ordered by
/// owner and name.
pub fn order_playlists(playlists: &mut [PlaylistAnalysis]) {
    playlists.sort_by(|a, b| {
        let a_mix = !a.name.contains(DAILY_MIX);
        let b_mix = !b.name.contains(DAILY_MIX);
        (a_mix, &a.owner, &a.name).cmp(&(b_mix, &b.owner, &b.name))
    });
}

pub async fn playlists(session: &Session) -> Result<Snapshot, FeatureError> {
    let playlists = all_user_playlists(session).await?;

    let gate = Semaphore::new(ANALYSIS_CONCURRENCY);
    let results = join_all(playlists.iter().map(|p| analyse(session, &gate, p))).await;
    let mut analysed = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    order_playlists(&mut analysed);
    debug!(count = analysed.len(), "playlists analysed");

    Ok(Snapshot::new(
        Feature::Playlists,
        format!("{} Playlists", analysed.len()),
        json!({ "playlists": analysed }),
    ))
}
