use std::collections::HashMap;

use spotplus::config::{
    DEFAULT_PLAYLIST_DESCRIPTION, DEFAULT_TOLERANCE_PERCENT, DEFAULT_TRACK_COUNT, Settings,
};

fn settings_from(pairs: &[(&str, &str)]) -> Settings {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults_without_environment() {
    let settings = settings_from(&[]);

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.tolerance_percent, DEFAULT_TOLERANCE_PERCENT);
    assert_eq!(settings.track_count, DEFAULT_TRACK_COUNT);
    assert_eq!(settings.playlist_description, DEFAULT_PLAYLIST_DESCRIPTION);
    assert!(settings.lyrics_api_token.is_none());
    assert!(settings.history_playlist_id.is_none());
}

#[test]
fn test_values_are_read() {
    let settings = settings_from(&[
        ("MUSIXMATCH_API_TOKEN", "secret"),
        ("SPOTIFY_HISTORY_PLAYLIST_ID", "37i9dQZF1DX0XUsuxWHRQd"),
        ("SPOTPLUS_TOLERANCE", "15"),
        ("SPOTPLUS_TRACK_COUNT", "40"),
    ]);

    assert_eq!(settings.lyrics_api_token.as_deref(), Some("secret"));
    assert_eq!(
        settings.history_playlist_id.as_deref(),
        Some("37i9dQZF1DX0XUsuxWHRQd")
    );
    assert_eq!(settings.tolerance_percent, 15.0);
    assert_eq!(settings.track_count, 40);
}

#[test]
fn test_invalid_values_fall_back_to_defaults() {
    let settings = settings_from(&[
        ("MUSIXMATCH_API_TOKEN", "  "),
        ("SPOTPLUS_TOLERANCE", "250"),
        ("SPOTPLUS_TRACK_COUNT", "0"),
    ]);

    assert!(settings.lyrics_api_token.is_none());
    assert_eq!(settings.tolerance_percent, DEFAULT_TOLERANCE_PERCENT);
    assert_eq!(settings.track_count, DEFAULT_TRACK_COUNT);

    let settings = settings_from(&[("SPOTPLUS_TRACK_COUNT", "many")]);
    assert_eq!(settings.track_count, DEFAULT_TRACK_COUNT);
}
