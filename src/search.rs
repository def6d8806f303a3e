//! General search, artist profile search and category playlists.

use std::str::FromStr;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::{
    error::FeatureError,
    session::Session,
    state::{Feature, Snapshot},
    types::{Album, Artist, Playlist, SearchKind, Track},
    utils::{first_image_url, format_followers, is_spotify_owned, release_year},
};

const GENERAL_LIMIT: u32 = 25;
const ARTIST_LOOKUP_LIMIT: u32 = 5;
const ARTIST_PLAYLIST_LIMIT: u32 = 30;
const ARTIST_ALBUM_LIMIT: u32 = 50;
const CATEGORY_PLAYLIST_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    General,
    ArtistProfile,
}

impl SearchType {
    pub fn label(&self) -> &'static str {
        match self {
            SearchType::General => "General Search",
            SearchType::ArtistProfile => "Artist Profile",
        }
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "general search" | "general" => Ok(SearchType::General),
            "artist profile" | "artist" => Ok(SearchType::ArtistProfile),
            other => Err(format!("unknown search type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub term: String,
    pub search_type: SearchType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    pub name: String,
    pub artists: String,
    pub image: String,
    pub uri: String,
    pub id: String,
    pub info: String,
    pub popularity: u32,
    pub release: String,
    pub saved: bool,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            artists: track
                .artists
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            image: first_image_url(&track.album.images),
            uri: track.uri.clone(),
            id: track.id.clone(),
            info: track.name.clone(),
            popularity: track.popularity,
            release: release_year(&track.album.release_date),
            saved: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumSummary {
    pub name: String,
    pub artists: String,
    pub image: Option<String>,
    pub uri: String,
    pub id: String,
    pub info: String,
    pub release: String,
    pub saved: bool,
}

impl From<&Album> for AlbumSummary {
    fn from(album: &Album) -> Self {
        Self {
            name: album.name.clone(),
            artists: album
                .artists
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            image: album.images.first().map(|i| i.url.clone()),
            uri: album.uri.clone(),
            id: album.id.clone(),
            info: album.name.clone(),
            release: release_year(&album.release_date),
            saved: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistSummary {
    pub name: String,
    pub artists: String,
    pub image: String,
    pub uri: String,
    pub id: String,
    pub info: String,
    pub popularity: u32,
    pub saved: bool,
}

impl From<&Artist> for ArtistSummary {
    fn from(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            artists: artist.name.clone(),
            image: first_image_url(&artist.images),
            uri: artist.uri.clone(),
            id: artist.id.clone(),
            info: artist.name.clone(),
            popularity: artist.popularity,
            saved: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSummary {
    pub name: String,
    pub artists: Option<String>,
    pub image: Option<String>,
    pub uri: String,
    pub id: String,
    pub info: String,
    pub owner: String,
    pub tracks: u64,
    #[serde(skip)]
    spotify_owned: bool,
}

impl From<&Playlist> for PlaylistSummary {
    fn from(playlist: &Playlist) -> Self {
        Self {
            name: playlist.name.clone(),
            artists: None,
            image: playlist.images.first().map(|i| i.url.clone()),
            uri: playlist.uri.clone(),
            id: playlist.id.clone(),
            info: playlist.description.clone(),
            owner: playlist.owner.display_name.clone(),
            tracks: playlist.tracks.total,
            spotify_owned: is_spotify_owned(&playlist.owner),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistProfile {
    pub name: String,
    pub followers: String,
    pub genres: Vec<String>,
    pub id: String,
    pub image: String,
    pub popularity: u32,
    pub following: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub playlists: Vec<PlaylistSummary>,
    pub albums: Vec<AlbumSummary>,
    pub related_artists: Vec<ArtistSummary>,
    pub tracks: Vec<TrackSummary>,
    pub profile: Option<ArtistProfile>,
}

fn flag(flags: &[bool], index: usize) -> bool {
    flags.get(index).copied().unwrap_or(false)
}

/// Spotify editorial playlists first, otherwise keeps the remote order.
fn spotify_first(playlists: &mut [PlaylistSummary]) {
    playlists.sort_by_key(|p| !p.spotify_owned);
}

async fn mark_saved_tracks(
    session: &Session,
    tracks: &mut [TrackSummary],
) -> Result<(), FeatureError> {
    if tracks.is_empty() {
        return Ok(());
    }
    let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
    let flags = session.client().saved_tracks_contains(&uris).await?;
    for (i, track) in tracks.iter_mut().enumerate() {
        track.saved = flag(&flags, i);
    }
    Ok(())
}

async fn mark_saved_albums(
    session: &Session,
    albums: &mut [AlbumSummary],
) -> Result<(), FeatureError> {
    if albums.is_empty() {
        return Ok(());
    }
    let uris: Vec<String> = albums.iter().map(|a| a.uri.clone()).collect();
    let flags = session.client().saved_albums_contains(&uris).await?;
    for (i, album) in albums.iter_mut().enumerate() {
        album.saved = flag(&flags, i);
    }
    Ok(())
}

async fn mark_followed_artists(
    session: &Session,
    artists: &mut [ArtistSummary],
) -> Result<(), FeatureError> {
    if artists.is_empty() {
        return Ok(());
    }
    let uris: Vec<String> = artists.iter().map(|a| a.uri.clone()).collect();
    let flags = session.client().following_artists_contains(&uris).await?;
    for (i, artist) in artists.iter_mut().enumerate() {
        artist.saved = flag(&flags, i);
    }
    Ok(())
}

async fn general_search(session: &Session, term: &str) -> Result<SearchResults, FeatureError> {
    let found = session
        .client()
        .search(
            term,
            &[SearchKind::Track, SearchKind::Album, SearchKind::Playlist],
            GENERAL_LIMIT,
            session.market(),
        )
        .await?;
    debug!(term, "general search executed");

    let mut results = SearchResults {
        tracks: found
            .tracks
            .map(|p| p.items.iter().map(TrackSummary::from).collect())
            .unwrap_or_default(),
        albums: found
            .albums
            .map(|p| p.items.iter().map(AlbumSummary::from).collect())
            .unwrap_or_default(),
        playlists: found
            .playlists
            .map(|p| p.items.iter().map(PlaylistSummary::from).collect())
            .unwrap_or_default(),
        ..Default::default()
    };

    mark_saved_tracks(session, &mut results.tracks).await?;
    mark_saved_albums(session, &mut results.albums).await?;
    spotify_first(&mut results.playlists);

    Ok(results)
}

async fn artist_profile_search(
    session: &Session,
    term: &str,
) -> Result<SearchResults, FeatureError> {
    let client = session.client();
    let market = session.market();

    let lookup = client
        .search(term, &[SearchKind::Artist], ARTIST_LOOKUP_LIMIT, market)
        .await?;
    let main = lookup
        .artists
        .and_then(|p| p.items.into_iter().next())
        .ok_or_else(|| FeatureError::InvalidInput(format!("no artist found for '{}'", term)))?;

    let main_ids = vec![main.id.clone()];
    let (playlists, albums, related, top_tracks, profile, following) = tokio::try_join!(
        client.search(
            &main.name,
            &[SearchKind::Playlist],
            ARTIST_PLAYLIST_LIMIT,
            market
        ),
        client.artist_albums(&main.id, market, ARTIST_ALBUM_LIMIT),
        client.artist_related_artists(&main.id),
        client.artist_top_tracks(&main.id, market),
        client.artist(&main.id),
        client.following_artists_contains(&main_ids),
    )?;
    debug!(artist = %main.name, "artist profile retrieved");

    let needle = term.to_lowercase();
    let mut results = SearchResults {
        tracks: top_tracks.iter().map(TrackSummary::from).collect(),
        albums: albums.items.iter().map(AlbumSummary::from).collect(),
        related_artists: related.iter().map(ArtistSummary::from).collect(),
        playlists: playlists
            .playlists
            .map(|p| p.items)
            .unwrap_or_default()
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .map(PlaylistSummary::from)
            .collect(),
        profile: Some(ArtistProfile {
            name: profile.name.clone(),
            followers: format_followers(profile.followers.total),
            genres: profile.genres.clone(),
            id: profile.id.clone(),
            image: first_image_url(&profile.images),
            popularity: profile.popularity,
            following: flag(&following, 0),
        }),
    };

    mark_saved_tracks(session, &mut results.tracks).await?;
    mark_saved_albums(session, &mut results.albums).await?;
    mark_followed_artists(session, &mut results.related_artists).await?;

    results
        .albums
        .sort_by(|a, b| b.release.cmp(&a.release));
    spotify_first(&mut results.playlists);

    Ok(results)
}

pub async fn search(session: &Session, request: SearchRequest) -> Result<Snapshot, FeatureError> {
    let term = request.term.trim();
    if term.is_empty() {
        return Err(FeatureError::InvalidInput(
            "search term must not be empty".to_string(),
        ));
    }

    let results = match request.search_type {
        SearchType::General => general_search(session, term).await?,
        SearchType::ArtistProfile => artist_profile_search(session, term).await?,
    };

    Ok(Snapshot::new(
        Feature::Search,
        request.search_type.label(),
        json!({ "search_results": results }),
    ))
}

/// Non-empty playlists of a browse category.
pub async fn category_playlists(
    session: &Session,
    category_id: &str,
) -> Result<Snapshot, FeatureError> {
    let page = session
        .client()
        .category_playlists(category_id, session.market(), CATEGORY_PLAYLIST_LIMIT)
        .await?;

    let playlists: Vec<Playlist> = page
        .items
        .into_iter()
        .filter(|p| p.tracks.total != 0)
        .collect();

    Ok(Snapshot::new(
        Feature::CategoryPlaylists,
        format!("{} Playlists", playlists.len()),
        json!({ "playlists": playlists }),
    ))
}

