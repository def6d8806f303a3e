mod common;

use std::{collections::HashSet, sync::Arc};

use rand::{SeedableRng, rngs::StdRng};

use common::{FakeSpotify, session_with, track};
use spotplus::{
    command::{Command, Dispatcher},
    config::Settings,
    error::{ApiError, FeatureError},
    recommend::{self, MusicMachineRequest, QUEUE_ONLY, parse_seeds},
    state::{Feature, StateBoard},
};

async fn dispatcher(fake: &Arc<FakeSpotify>) -> Dispatcher {
    let session = session_with(fake, Settings::default()).await;
    Dispatcher::with_rng(
        Arc::new(session),
        Arc::new(StateBoard::new()),
        StdRng::seed_from_u64(7),
    )
}

fn track_uris(snapshot: &spotplus::state::Snapshot) -> Vec<String> {
    snapshot.attributes["Track URIs"]
        .as_array()
        .map(|uris| {
            uris.iter()
                .filter_map(|u| u.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_parse_seeds_ignores_whitespace() {
    assert_eq!(parse_seeds("a, b ,c"), vec!["a", "b", "c"]);
    assert_eq!(parse_seeds(" rock , jazz,"), vec!["rock", "jazz"]);
    assert!(parse_seeds("").is_empty());
    assert!(parse_seeds(" , ").is_empty());
}

#[test]
fn test_has_seeds() {
    let mut request = MusicMachineRequest::default();
    assert!(!request.has_seeds());
    request.seed_genres = vec!["rock".to_string()];
    assert!(request.has_seeds());
}

#[tokio::test]
async fn test_build_respects_count_and_deduplicates() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;

    let request = MusicMachineRequest {
        count: Some(30),
        ..Default::default()
    };
    let outcome = dispatcher
        .dispatch(Command::BuildPlaylist(request))
        .await
        .expect("build succeeds");
    let snapshot = outcome.snapshot().expect("summary is published");

    let uris = track_uris(snapshot);
    assert_eq!(uris.len(), 30);
    assert_eq!(snapshot.attributes["Number of Tracks"], 30);
    let unique: HashSet<&String> = uris.iter().collect();
    assert_eq!(unique.len(), uris.len());

    assert_eq!(snapshot.attributes["Artists"].as_array().map(Vec::len), Some(10));
    assert_eq!(snapshot.attributes["Tracks"].as_array().map(Vec::len), Some(5));
    assert_eq!(snapshot.attributes["Genres"], serde_json::json!(["indie", "rock"]));
    assert_eq!(fake.count_calls("recommendations"), 3);

    let playlist_uri = snapshot.attributes["Playlist ID"].as_str().unwrap_or_default();
    assert!(playlist_uri.starts_with("spotify:playlist:"));
    assert_eq!(fake.contents("created0"), uris);
}

#[tokio::test]
async fn test_build_tops_up_from_track_seeds_when_short() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    *fake.recommendation_size.lock().unwrap() = 10;
    let session = session_with(&fake, Settings::default()).await;

    let request = MusicMachineRequest {
        count: Some(100),
        create_playlist: false,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);
    let snapshot = recommend::build(&session, request, &mut rng)
        .await
        .expect("build succeeds");

    // 20 from the artist halves are below count / 2, so 10 more come from
    // the track seeded request (count / 4 caps at 25).
    let uris = track_uris(&snapshot);
    assert_eq!(uris.len(), 30);
    assert_eq!(snapshot.attributes["Playlist ID"], QUEUE_ONLY);
    assert_eq!(fake.count_calls("create_playlist"), 0);
}

#[tokio::test]
async fn test_rebuilding_same_playlist_replaces_contents() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;

    let request = MusicMachineRequest {
        name: "Evening".to_string(),
        count: Some(25),
        ..Default::default()
    };
    dispatcher
        .dispatch(Command::BuildPlaylist(request.clone()))
        .await
        .expect("first build succeeds");
    let second = dispatcher
        .dispatch(Command::BuildPlaylist(request))
        .await
        .expect("second build succeeds");

    assert_eq!(fake.count_calls("create_playlist"), 1);
    assert_eq!(fake.count_calls("change_playlist_details"), 1);
    let snapshot = second.snapshot().expect("summary is published");
    assert_eq!(fake.contents("created0"), track_uris(snapshot));
    assert_eq!(fake.contents("created0").len(), 25);
}

#[tokio::test]
async fn test_build_with_too_few_top_tracks() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    fake.top_tracks.lock().unwrap().truncate(3);
    let dispatcher = dispatcher(&fake).await;

    let result = dispatcher
        .dispatch(Command::BuildPlaylist(MusicMachineRequest::default()))
        .await;

    assert!(matches!(
        result,
        Err(FeatureError::InsufficientCandidates {
            needed: 5,
            available: 3
        })
    ));
    assert_eq!(fake.count_calls("recommendations"), 0);
    let current = dispatcher.board().current(Feature::MusicMachine);
    assert!(current.is_idle());
    assert!(current.available);
}

#[tokio::test]
async fn test_build_with_explicit_seeds() {
    let fake = Arc::new(FakeSpotify::new());
    let dispatcher = dispatcher(&fake).await;

    let request = MusicMachineRequest {
        count: Some(10),
        seed_genres: vec!["rock".to_string()],
        seed_artists: vec!["artist1".to_string()],
        ..Default::default()
    };
    let outcome = dispatcher
        .dispatch(Command::BuildPlaylist(request))
        .await
        .expect("seeded build succeeds");
    let snapshot = outcome.snapshot().expect("summary is published");

    assert_eq!(fake.count_calls("recommendations"), 1);
    assert_eq!(fake.count_calls("top_tracks"), 0);
    assert_eq!(snapshot.attributes["Genres"], serde_json::json!(["rock"]));
    assert_eq!(snapshot.attributes["Artists"], serde_json::json!(["Seed artist1"]));
    assert_eq!(track_uris(snapshot).len(), 10);
}

#[tokio::test]
async fn test_queue_only_playback() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;

    let request = MusicMachineRequest {
        count: Some(20),
        create_playlist: false,
        play_now: true,
        ..Default::default()
    };
    let outcome = dispatcher
        .dispatch(Command::BuildPlaylist(request))
        .await
        .expect("build succeeds");
    let snapshot = outcome.snapshot().expect("summary is published");

    assert_eq!(snapshot.attributes["Playlist Name"], QUEUE_ONLY);
    assert_eq!(snapshot.attributes["Playlist ID"], QUEUE_ONLY);
    assert_eq!(fake.count_calls("start_playback"), 1);
    assert_eq!(fake.count_calls("create_playlist"), 0);
}

#[tokio::test]
async fn test_transient_failure_marks_feature_unavailable() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;
    let first = dispatcher
        .dispatch(Command::BuildPlaylist(MusicMachineRequest {
            count: Some(10),
            ..Default::default()
        }))
        .await
        .expect("build succeeds");
    let previous = first.snapshot().expect("summary is published").clone();

    fake.fail(ApiError::Transient("connection reset".to_string()));
    let result = dispatcher
        .dispatch(Command::BuildPlaylist(MusicMachineRequest::default()))
        .await;
    assert!(matches!(result, Err(FeatureError::Unavailable(_))));

    let current = dispatcher.board().current(Feature::MusicMachine);
    assert!(!current.available);
    assert_eq!(current.state, previous.state);
    assert_eq!(current.attributes, previous.attributes);

    // Other features are untouched.
    assert!(dispatcher.board().current(Feature::Search).available);
}

#[tokio::test]
async fn test_top_tracks_extended_pages() {
    let fake = Arc::new(FakeSpotify::new());
    *fake.top_tracks.lock().unwrap() = (0..120)
        .map(|i| track(&format!("t{}", i), "Song", "Someone"))
        .collect();

    let tracks = recommend::top_tracks_extended(fake.as_ref(), Default::default())
        .await
        .expect("top tracks are fetched");
    assert_eq!(tracks.len(), 99);
    assert_eq!(fake.count_calls("top_tracks"), 2);
}

#[tokio::test]
async fn test_zero_count_is_rejected() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;
    fake.clear_calls();

    let result = dispatcher
        .dispatch(Command::BuildPlaylist(MusicMachineRequest {
            count: Some(0),
            ..Default::default()
        }))
        .await;

    assert!(matches!(result, Err(FeatureError::InvalidInput(_))));
    assert!(fake.calls().is_empty());
    assert!(dispatcher.board().current(Feature::MusicMachine).is_idle());
}

#[tokio::test]
async fn test_playlist_write_failure_still_publishes_and_plays_uris() {
    let fake = Arc::new(FakeSpotify::with_listening_history());
    let dispatcher = dispatcher(&fake).await;
    fake.fail_call(
        "create_playlist",
        ApiError::Remote {
            status: 403,
            reason: "Forbidden".to_string(),
        },
    );

    let outcome = dispatcher
        .dispatch(Command::BuildPlaylist(MusicMachineRequest {
            count: Some(20),
            play_now: true,
            ..Default::default()
        }))
        .await
        .expect("build succeeds despite the playlist failure");
    let snapshot = outcome.snapshot().expect("summary is published");

    assert_eq!(snapshot.attributes["Playlist ID"], QUEUE_ONLY);
    assert_eq!(snapshot.attributes["Number of Tracks"], 20);
    assert_eq!(
        dispatcher.board().current(Feature::MusicMachine).state,
        snapshot.state
    );
    assert!(!dispatcher.board().current(Feature::MusicMachine).is_idle());

    let requests = fake.playback_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].context_uri.is_none());
    assert_eq!(requests[0].uris.clone().unwrap_or_default(), track_uris(snapshot));
}
