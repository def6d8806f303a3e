//! Account summary.

use serde_json::json;
use tracing::debug;

use crate::{
    error::{ApiError, FeatureError},
    session::Session,
    state::{Feature, Snapshot},
    types::Category,
    utils::first_image_url,
};

const CATEGORY_PAGE_SIZE: u32 = 50;

/// All browse categories, sorted by name.
pub async fn all_categories(session: &Session) -> Result<Vec<Category>, ApiError> {
    let mut categories = Vec::new();
    let mut offset = 0;

    loop {
        let page = session
            .client()
            .categories(session.market(), CATEGORY_PAGE_SIZE, offset)
            .await?;
        let fetched = page.items.len() as u32;
        categories.extend(page.items);

        if page.next.is_none() || fetched == 0 {
            break;
        }
        offset += CATEGORY_PAGE_SIZE;
    }

    debug!(count = categories.len(), "categories cycles complete");
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
}

pub async fn profile(session: &Session) -> Result<Snapshot, FeatureError> {
    let client = session.client();
    let (me, artists, tracks, albums, playlists, genres) = tokio::try_join!(
        client.me(),
        client.followed_artists(1, None),
        client.saved_tracks(1, 0),
        client.saved_albums(1, 0),
        client.current_user_playlists(1, 0),
        client.genre_seeds(),
    )?;
    let categories = all_categories(session).await?;

    let profile_image = me.images.first().map(|_| first_image_url(&me.images));
    let devices = session.devices().list();

    Ok(Snapshot::new(
        Feature::Profile,
        me.product.clone(),
        json!({
            "display_name": me.display_name,
            "country": me.country,
            "artists_followed": artists.total,
            "albums_saved": albums.total,
            "tracks_saved": tracks.total,
            "playlists": playlists.total,
            "followers": me.followers.total,
            "profile_image": profile_image,
            "product": me.product,
            "devices": devices.as_ref(),
            "seed_genres": genres,
            "categories": categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        }),
    ))
}
