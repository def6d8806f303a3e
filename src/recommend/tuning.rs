//! Target attribute ranges for recommendation requests.
//!
//! Targets arrive on a 0-100 scale. Every range is computed in those percent
//! units and only then scaled to the API's 0-1 scale, which keeps results like
//! `50 ± 10` at exactly `0.40..0.60`.

use serde_json::{Map, Value, json};

use crate::{spotify::RecommendationQuery, utils::round2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Valence,
    Energy,
    Acousticness,
    Danceability,
    Instrumentalness,
    Liveness,
    Speechiness,
    Popularity,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Valence,
        Attribute::Energy,
        Attribute::Acousticness,
        Attribute::Danceability,
        Attribute::Instrumentalness,
        Attribute::Liveness,
        Attribute::Speechiness,
        Attribute::Popularity,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Attribute::Valence => "valence",
            Attribute::Energy => "energy",
            Attribute::Acousticness => "acousticness",
            Attribute::Danceability => "danceability",
            Attribute::Instrumentalness => "instrumentalness",
            Attribute::Liveness => "liveness",
            Attribute::Speechiness => "speechiness",
            Attribute::Popularity => "popularity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Requested center values, each on a 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Targets {
    pub valence: Option<f64>,
    pub energy: Option<f64>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub speechiness: Option<f64>,
    pub popularity: Option<f64>,
}

impl Targets {
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Valence => self.valence,
            Attribute::Energy => self.energy,
            Attribute::Acousticness => self.acousticness,
            Attribute::Danceability => self.danceability,
            Attribute::Instrumentalness => self.instrumentalness,
            Attribute::Liveness => self.liveness,
            Attribute::Speechiness => self.speechiness,
            Attribute::Popularity => self.popularity,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: Option<f64>) {
        let slot = match attribute {
            Attribute::Valence => &mut self.valence,
            Attribute::Energy => &mut self.energy,
            Attribute::Acousticness => &mut self.acousticness,
            Attribute::Danceability => &mut self.danceability,
            Attribute::Instrumentalness => &mut self.instrumentalness,
            Attribute::Liveness => &mut self.liveness,
            Attribute::Speechiness => &mut self.speechiness,
            Attribute::Popularity => &mut self.popularity,
        };
        *slot = value;
    }

    /// Set targets in a fixed attribute order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        Attribute::ALL
            .into_iter()
            .filter_map(|a| self.get(a).map(|v| (a, v)))
    }
}

/// Derives the accepted range around `target` for `attribute`.
///
/// Both `target` and `tolerance_percent` are clamped to `0..=100`. Popularity
/// stays on the 0-100 integer scale, all other attributes are returned on the
/// 0-1 scale rounded to two decimals.
pub fn derive_range(attribute: Attribute, target: f64, tolerance_percent: f64) -> Range {
    let target = target.clamp(0.0, 100.0);
    let tolerance = tolerance_percent.clamp(0.0, 100.0);

    let low = (target - tolerance).max(0.0);
    let high = (target + tolerance).min(100.0);

    if attribute == Attribute::Popularity {
        return Range {
            min: low.trunc(),
            max: high.trunc(),
        };
    }

    let mut range = Range {
        min: round2(low / 100.0),
        max: round2(high / 100.0),
    };

    // The catalogue has very few tracks at these extremes, so the bounds are
    // widened to still get enough recommendations.
    match attribute {
        Attribute::Energy if target == 100.0 => range.min = 0.90,
        Attribute::Acousticness if target == 0.0 => range.max = 0.10,
        Attribute::Acousticness if (10.0..=20.0).contains(&target) => range.min = 0.01,
        _ => {}
    }

    range
}

/// `min_*`/`max_*` query pairs for every set target.
pub fn tuning_bounds(targets: &Targets, tolerance_percent: f64) -> Vec<(String, f64)> {
    targets
        .iter()
        .flat_map(|(attribute, target)| {
            let range = derive_range(attribute, target, tolerance_percent);
            [
                (format!("min_{}", attribute.key()), range.min),
                (format!("max_{}", attribute.key()), range.max),
            ]
        })
        .collect()
}

/// The shared request parameters as reported in the builder summary.
pub fn stats(query: &RecommendationQuery) -> Value {
    let mut stats = Map::new();
    stats.insert("limit".to_string(), json!(query.limit));
    if let Some(market) = &query.market {
        stats.insert("market".to_string(), json!(market));
    }
    for (key, value) in &query.bounds {
        let value = if key.ends_with("popularity") {
            json!(*value as i64)
        } else {
            json!(value)
        };
        stats.insert(key.clone(), value);
    }
    Value::Object(stats)
}
