use std::{collections::HashSet, hash::Hash};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::types::{Image, Owner};

/// Generates a 128 character PKCE code verifier.
pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

/// Derives the S256 code challenge for `verifier`.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Formats a follower count as `1.2M`, `3.4k` or the plain number.
pub fn format_followers(followers: u64) -> String {
    if followers >= 1_000_000 {
        format!("{:.1}M", followers as f64 / 1_000_000.0)
    } else if followers >= 1_000 {
        format!("{:.1}k", followers as f64 / 1_000.0)
    } else {
        followers.to_string()
    }
}

/// Formats milliseconds as `mm:ss`.
pub fn format_duration(duration_ms: u64) -> String {
    let seconds = duration_ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Sort key that ignores the article in names like "The Cure".
pub fn sort_key_without_the(name: &str) -> String {
    name.replace("The ", "")
}

/// Year part of a release date in any precision (`2020`, `2020-05`,
/// `2020-05-17`).
pub fn release_year(release_date: &str) -> String {
    release_date.split('-').next().unwrap_or_default().to_string()
}

/// Removes later duplicates, keeping the first occurrence in order.
pub fn dedup_by_key<T, K, F>(items: &mut Vec<T>, mut key: F)
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

pub fn first_image_url(images: &[Image]) -> String {
    images.first().map(|i| i.url.clone()).unwrap_or_default()
}

/// Editorial playlists are owned by the `spotify` account.
pub fn is_spotify_owned(owner: &Owner) -> bool {
    owner.id == "spotify" || owner.display_name.eq_ignore_ascii_case("spotify")
}

/// Removes the query string and fragment from a media id such as
/// `https://open.spotify.com/track/abc?si=123`.
pub fn strip_media_uri(media_id: &str) -> String {
    match url::Url::parse(media_id) {
        Ok(mut url) if url.has_host() => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        _ => media_id
            .split(['?', '#'])
            .next()
            .unwrap_or(media_id)
            .to_string(),
    }
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
