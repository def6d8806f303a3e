mod common;

use std::sync::Arc;

use common::{FakeSpotify, playlist, session_with, track};
use spotplus::{
    command::{Command, Dispatcher, Outcome},
    config::Settings,
    management::SnapshotStore,
    song::{FollowKind, FollowRequest, follow_target, song_data},
    state::{Feature, NowPlaying, StateBoard},
    types::AudioFeatures,
};

fn request(kind: FollowKind, id: Option<&str>) -> FollowRequest {
    FollowRequest {
        kind,
        id: id.map(str::to_string),
    }
}

fn playing_everything() -> NowPlaying {
    NowPlaying {
        track_id: Some("t1".to_string()),
        track_uri: Some("spotify:track:t1".to_string()),
        artist_id: Some("a1".to_string()),
        album_id: Some("al1".to_string()),
        context_uri: Some("spotify:album:al1".to_string()),
    }
}

#[test]
fn test_follow_kind_from_str() {
    assert_eq!("Artist".parse::<FollowKind>(), Ok(FollowKind::Artist));
    assert_eq!(" playlist ".parse::<FollowKind>(), Ok(FollowKind::Playlist));
    assert!("show".parse::<FollowKind>().is_err());
    assert_eq!(FollowKind::Album.to_string(), "album");
}

#[test]
fn test_follow_target_prefers_explicit_id() {
    let now = playing_everything();
    let target = follow_target(&request(FollowKind::Track, Some("other")), Some(&now));
    assert_eq!(target.as_deref(), Some("other"));

    // An empty id counts as absent.
    let target = follow_target(&request(FollowKind::Track, Some("")), Some(&now));
    assert_eq!(target.as_deref(), Some("spotify:track:t1"));
}

#[test]
fn test_follow_target_defaults_to_now_playing() {
    let now = playing_everything();
    assert_eq!(
        follow_target(&request(FollowKind::Artist, None), Some(&now)).as_deref(),
        Some("a1")
    );
    assert_eq!(
        follow_target(&request(FollowKind::Album, None), Some(&now)).as_deref(),
        Some("al1")
    );

    let without_uri = NowPlaying {
        track_uri: None,
        ..playing_everything()
    };
    assert_eq!(
        follow_target(&request(FollowKind::Track, None), Some(&without_uri)).as_deref(),
        Some("t1")
    );
}

#[test]
fn test_follow_target_playlist_needs_playlist_context() {
    let album_context = playing_everything();
    assert_eq!(
        follow_target(&request(FollowKind::Playlist, None), Some(&album_context)),
        None
    );

    let playlist_context = NowPlaying {
        context_uri: Some("spotify:playlist:pl1".to_string()),
        ..playing_everything()
    };
    assert_eq!(
        follow_target(&request(FollowKind::Playlist, None), Some(&playlist_context)).as_deref(),
        Some("spotify:playlist:pl1")
    );

    assert_eq!(follow_target(&request(FollowKind::Artist, None), None), None);
}

#[tokio::test]
async fn test_song_data_when_nothing_is_playing() {
    let fake = Arc::new(FakeSpotify::new());
    let session = session_with(&fake, Settings::default()).await;

    let (snapshot, now_playing) = song_data(&session).await.expect("song data succeeds");

    assert_eq!(snapshot.state, "No Current Song");
    assert!(now_playing.is_none());
}

#[tokio::test]
async fn test_song_data_for_playlist_context() {
    let fake = Arc::new(FakeSpotify::new());
    fake.set_playing(track("t1", "Teardrop", "Massive Attack"), Some("spotify:playlist:pl1"));
    fake.playlists
        .lock()
        .unwrap()
        .push(playlist("pl1", "Trip Hop", "someone", 0));
    fake.audio_features.lock().unwrap().insert(
        "t1".to_string(),
        AudioFeatures {
            id: "t1".to_string(),
            energy: 0.734,
            valence: 0.2,
            tempo: 77.5,
            ..Default::default()
        },
    );
    let session = session_with(&fake, Settings::default()).await;

    let (snapshot, now_playing) = song_data(&session).await.expect("song data succeeds");
    let spotify = &snapshot.attributes["spotify"];

    assert_eq!(snapshot.state, "Teardrop");
    assert_eq!(spotify["spotify_track_id"], "t1");
    assert_eq!(spotify["spotify_energy"], 73);
    assert_eq!(spotify["spotify_valence"], 20);
    assert_eq!(spotify["spotify_tempo"], 77.5);
    assert_eq!(spotify["spotify_play_source"], "playlist");
    assert_eq!(spotify["spotify_playlist"]["name"], "Trip Hop");
    assert_eq!(spotify["spotify_playlist_follow"], true);
    assert_eq!(spotify["spotify_context_URI"], "spotify:playlist:pl1");
    assert!(spotify["lyrics_link"].is_null());

    let now_playing = now_playing.expect("now playing is reported");
    assert_eq!(now_playing.track_uri.as_deref(), Some("spotify:track:t1"));
    assert_eq!(now_playing.context_uri.as_deref(), Some("spotify:playlist:pl1"));
}

#[tokio::test]
async fn test_song_data_without_context_and_features() {
    let fake = Arc::new(FakeSpotify::new());
    fake.set_playing(track("t9", "Unknown", "Someone"), None);
    let session = session_with(&fake, Settings::default()).await;

    let (snapshot, _) = song_data(&session).await.expect("song data succeeds");
    let spotify = &snapshot.attributes["spotify"];

    assert_eq!(spotify["spotify_play_source"], "queue");
    assert!(spotify["spotify_energy"].is_null());
    assert!(spotify["spotify_playlist"].is_null());
    assert_eq!(fake.count_calls("playlist_is_following"), 0);
}

#[tokio::test]
async fn test_follow_without_anything_playing_is_a_no_op() {
    let fake = Arc::new(FakeSpotify::new());
    let session = session_with(&fake, Settings::default()).await;
    let dispatcher = Dispatcher::new(Arc::new(session), Arc::new(StateBoard::new()));
    fake.clear_calls();

    let outcome = dispatcher
        .dispatch(Command::Follow(request(FollowKind::Track, None)))
        .await
        .expect("follow succeeds");

    assert!(matches!(outcome, Outcome::Done));
    assert!(fake.calls().is_empty());
    assert!(dispatcher.board().current(Feature::SongData).is_idle());
}

#[tokio::test]
async fn test_follow_uses_ids_from_song_data() {
    let fake = Arc::new(FakeSpotify::new());
    fake.set_playing(track("t1", "Teardrop", "Massive Attack"), Some("spotify:playlist:pl1"));
    fake.playlists
        .lock()
        .unwrap()
        .push(playlist("pl1", "Trip Hop", "someone", 0));
    let session = session_with(&fake, Settings::default()).await;
    let dispatcher = Dispatcher::new(Arc::new(session), Arc::new(StateBoard::new()));

    dispatcher
        .dispatch(Command::SongData)
        .await
        .expect("song data succeeds");
    fake.clear_calls();

    dispatcher
        .dispatch(Command::Follow(request(FollowKind::Track, None)))
        .await
        .expect("follow track succeeds");
    dispatcher
        .dispatch(Command::Unfollow(request(FollowKind::Playlist, None)))
        .await
        .expect("unfollow playlist succeeds");

    assert_eq!(fake.calls(), vec!["save_tracks", "unfollow_playlist"]);
    assert_eq!(
        fake.saved_tracks.lock().unwrap().clone(),
        vec!["spotify:track:t1".to_string()]
    );
}

#[tokio::test]
async fn test_follow_after_restart_uses_restored_song_data() {
    let root = std::env::temp_dir().join(format!("spotplus-song-restart-{}", std::process::id()));
    let store = SnapshotStore::new(root.clone());

    let fake = Arc::new(FakeSpotify::new());
    fake.set_playing(track("t1", "Teardrop", "Massive Attack"), Some("spotify:playlist:pl1"));
    fake.playlists
        .lock()
        .unwrap()
        .push(playlist("pl1", "Trip Hop", "someone", 0));

    {
        let session = session_with(&fake, Settings::default()).await;
        let dispatcher = Dispatcher::new(Arc::new(session), Arc::new(StateBoard::new()));
        let outcome = dispatcher
            .dispatch(Command::SongData)
            .await
            .expect("song data succeeds");
        let snapshot = outcome.snapshot().expect("song data is published");
        store.persist(snapshot).await.expect("snapshot is written");
    }

    let board = Arc::new(StateBoard::new());
    board.restore(store.load_all().await);
    let restored = board.now_playing().expect("now playing is rebuilt");
    assert_eq!(restored.track_uri.as_deref(), Some("spotify:track:t1"));
    assert_eq!(restored.context_uri.as_deref(), Some("spotify:playlist:pl1"));

    let session = session_with(&fake, Settings::default()).await;
    let dispatcher = Dispatcher::new(Arc::new(session), board);
    fake.clear_calls();

    dispatcher
        .dispatch(Command::Follow(request(FollowKind::Track, None)))
        .await
        .expect("follow track succeeds");

    assert_eq!(fake.count_calls("save_tracks"), 1);
    assert_eq!(
        fake.saved_tracks.lock().unwrap().clone(),
        vec!["spotify:track:t1".to_string()]
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn test_now_playing_is_not_rebuilt_from_idle_song_data() {
    let board = StateBoard::new();
    board.restore(vec![spotplus::state::Snapshot::idle(Feature::SongData)]);

    assert!(board.now_playing().is_none());
}
