use spotplus::{
    recommend::tuning::{Attribute, Range, Targets, derive_range, stats, tuning_bounds},
    spotify::RecommendationQuery,
};

#[test]
fn test_derive_range_centers_on_target() {
    let range = derive_range(Attribute::Valence, 50.0, 10.0);
    assert_eq!(range, Range { min: 0.40, max: 0.60 });
}

#[test]
fn test_derive_range_clamps_to_scale() {
    let low = derive_range(Attribute::Danceability, 5.0, 20.0);
    assert_eq!(low.min, 0.0);
    assert_eq!(low.max, 0.25);

    let high = derive_range(Attribute::Liveness, 95.0, 20.0);
    assert_eq!(high.min, 0.75);
    assert_eq!(high.max, 1.0);

    // Out of range inputs are clamped before use.
    let clamped = derive_range(Attribute::Speechiness, 140.0, 250.0);
    assert_eq!(clamped, Range { min: 0.0, max: 1.0 });
}

#[test]
fn test_full_energy_widens_lower_bound() {
    let range = derive_range(Attribute::Energy, 100.0, 5.0);
    assert_eq!(range.min, 0.90);
    assert_eq!(range.max, 1.0);

    // Only the extreme target gets the widened bound.
    let range = derive_range(Attribute::Energy, 99.0, 5.0);
    assert_eq!(range.min, 0.94);
}

#[test]
fn test_acousticness_extremes() {
    let zero = derive_range(Attribute::Acousticness, 0.0, 5.0);
    assert_eq!(zero.min, 0.0);
    assert_eq!(zero.max, 0.10);

    let low = derive_range(Attribute::Acousticness, 15.0, 5.0);
    assert_eq!(low.min, 0.01);
    assert_eq!(low.max, 0.20);

    let mid = derive_range(Attribute::Acousticness, 50.0, 5.0);
    assert_eq!(mid, Range { min: 0.45, max: 0.55 });
}

#[test]
fn test_popularity_stays_on_integer_scale() {
    let range = derive_range(Attribute::Popularity, 55.5, 20.0);
    assert_eq!(range.min, 35.0);
    assert_eq!(range.max, 75.0);
}

#[test]
fn test_tuning_bounds_only_for_set_targets() {
    let targets = Targets {
        energy: Some(80.0),
        speechiness: Some(10.0),
        ..Default::default()
    };
    let bounds = tuning_bounds(&targets, 10.0);

    assert_eq!(
        bounds,
        vec![
            ("min_energy".to_string(), 0.70),
            ("max_energy".to_string(), 0.90),
            ("min_speechiness".to_string(), 0.0),
            ("max_speechiness".to_string(), 0.20),
        ]
    );
}

#[test]
fn test_targets_set_and_get() {
    let mut targets = Targets::default();
    assert_eq!(targets.iter().count(), 0);

    targets.set(Attribute::Popularity, Some(40.0));
    targets.set(Attribute::Valence, Some(60.0));
    assert_eq!(targets.get(Attribute::Popularity), Some(40.0));

    // Iteration order follows the attribute order, not insertion order.
    let keys: Vec<&str> = targets.iter().map(|(a, _)| a.key()).collect();
    assert_eq!(keys, vec!["valence", "popularity"]);
}

#[test]
fn test_stats_reports_query_parameters() {
    let query = RecommendationQuery {
        limit: 100,
        market: Some("DE".to_string()),
        bounds: vec![
            ("min_popularity".to_string(), 35.0),
            ("max_popularity".to_string(), 75.0),
            ("min_valence".to_string(), 0.4),
        ],
        ..Default::default()
    };
    let stats = stats(&query);

    assert_eq!(stats["limit"], 100);
    assert_eq!(stats["market"], "DE");
    assert_eq!(stats["min_popularity"], 35);
    assert_eq!(stats["max_popularity"], 75);
    assert_eq!(stats["min_valence"], 0.4);
}
