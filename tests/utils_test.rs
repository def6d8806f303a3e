use spotplus::types::{Image, Owner};
use spotplus::utils::*;

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    assert!(!challenge.is_empty());

    // Same input produces same output
    let challenge2 = generate_code_challenge(verifier);
    assert_eq!(challenge, challenge2);

    let challenge3 = generate_code_challenge("different_verifier");
    assert_ne!(challenge, challenge3);

    // URL-safe base64 without padding
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_format_followers() {
    assert_eq!(format_followers(0), "0");
    assert_eq!(format_followers(999), "999");
    assert_eq!(format_followers(1_000), "1.0k");
    assert_eq!(format_followers(12_345), "12.3k");
    assert_eq!(format_followers(2_500_000), "2.5M");
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0), "00:00");
    assert_eq!(format_duration(59_999), "00:59");
    assert_eq!(format_duration(225_000), "03:45");
    assert_eq!(format_duration(3_600_000), "60:00");
}

#[test]
fn test_sort_key_without_the() {
    assert_eq!(sort_key_without_the("The Cure"), "Cure");
    assert_eq!(sort_key_without_the("Radiohead"), "Radiohead");

    let mut names = vec!["The Smiths", "Blur", "The Cure", "Air"];
    names.sort_by_key(|n| sort_key_without_the(n));
    assert_eq!(names, vec!["Air", "Blur", "The Cure", "The Smiths"]);
}

#[test]
fn test_release_year() {
    assert_eq!(release_year("2020-05-17"), "2020");
    assert_eq!(release_year("2020-05"), "2020");
    assert_eq!(release_year("1999"), "1999");
    assert_eq!(release_year(""), "");
}

#[test]
fn test_dedup_by_key_keeps_first_occurrence() {
    let mut items = vec!["a", "b", "a", "c", "b"];
    dedup_by_key(&mut items, |s| s.to_string());
    assert_eq!(items, vec!["a", "b", "c"]);

    let mut pairs = vec![(1, "x"), (2, "y"), (1, "z")];
    dedup_by_key(&mut pairs, |p| p.0);
    assert_eq!(pairs, vec![(1, "x"), (2, "y")]);
}

#[test]
fn test_first_image_url() {
    assert_eq!(first_image_url(&[]), "");

    let images = vec![
        Image {
            url: "https://i.scdn.co/big".to_string(),
            height: Some(640),
            width: Some(640),
        },
        Image {
            url: "https://i.scdn.co/small".to_string(),
            height: Some(64),
            width: Some(64),
        },
    ];
    assert_eq!(first_image_url(&images), "https://i.scdn.co/big");
}

#[test]
fn test_is_spotify_owned() {
    let editorial = Owner {
        id: "spotify".to_string(),
        display_name: "Spotify".to_string(),
    };
    let user = Owner {
        id: "someone".to_string(),
        display_name: "Someone".to_string(),
    };
    assert!(is_spotify_owned(&editorial));
    assert!(!is_spotify_owned(&user));
}

#[test]
fn test_strip_media_uri() {
    assert_eq!(
        strip_media_uri("https://open.spotify.com/track/abc123?si=xyz"),
        "https://open.spotify.com/track/abc123"
    );
    assert_eq!(strip_media_uri("spotify:track:abc123"), "spotify:track:abc123");
    assert_eq!(strip_media_uri("abc123?si=xyz"), "abc123");
    assert_eq!(strip_media_uri("abc123#frag"), "abc123");
}

#[test]
fn test_round2() {
    assert_eq!(round2(0.456), 0.46);
    assert_eq!(round2(0.4), 0.4);
    assert_eq!(round2(1.0 / 3.0), 0.33);
}
