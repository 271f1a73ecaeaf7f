//! End-to-end query scenarios over a small hand-built world

use epoch_atlas_lib::loader;
use epoch_atlas_lib::*;
use geo::{Geometry, LineString, Polygon};
use std::collections::BTreeMap;

fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]),
        vec![],
    ))
}

fn atlas_with(regions: Vec<Region>, cities: Vec<City>) -> Atlas {
    Atlas::new(
        EngineConfig::default(),
        Datasets {
            regions,
            cities,
            ..Datasets::default()
        },
    )
}

#[test]
fn test_single_region_metrics() {
    let regions = vec![
        Region::new("Kingdom A", -500, 100, 2_000_000.0, rect(0.0, 0.0, 10.0, 10.0)).unwrap(),
        Region::new("Later Kingdom", 200, 400, 10.0, rect(0.0, 0.0, 10.0, 10.0)).unwrap(),
    ];
    let atlas = atlas_with(regions, Vec::new());

    let visible = atlas.visible_at(-200);
    assert_eq!(visible.len(), 1);

    let metrics = atlas.year_metrics(-200);
    assert_eq!(metrics.totals.civilizations, 1);
    assert_eq!(metrics.totals.land_area, 2_000_000.0);
    assert_eq!(metrics.totals.average_age, Some(300.0));
}

#[test]
fn test_city_population_between_samples() {
    let populations: BTreeMap<Year, u32> = [(-100, 5000), (200, 20000)].into_iter().collect();
    let city = City::new("Town", 5.0, 5.0, populations, None, None).unwrap();
    let atlas = atlas_with(Vec::new(), vec![city]);

    let resolved = atlas.resolve_population("Town", 50).unwrap();
    assert_eq!(resolved.value, 5000.0);
    assert_eq!(resolved.source_year, -100);
    assert_eq!(resolved.confidence, Confidence::Estimated);
    assert_eq!(resolved.gap, 150);
}

#[test]
fn test_city_population_before_first_record() {
    let populations: BTreeMap<Year, u32> = [(-100, 5000), (200, 20000)].into_iter().collect();
    let city = City::new("Town", 5.0, 5.0, populations, None, None).unwrap();
    let atlas = atlas_with(Vec::new(), vec![city]);

    assert!(atlas.resolve_population("Town", -150).is_none());
    assert!(atlas.resolve_population("Elsewhere", 50).is_none());
}

#[test]
fn test_refiled_fragments_merge_into_one_reign() {
    let regions = vec![
        Region::new("Kingdom X", 100, 150, 500.0, rect(0.0, 0.0, 10.0, 10.0)).unwrap(),
        Region::new("Kingdom X", 153, 200, 700.0, rect(0.0, 0.0, 10.0, 10.0)).unwrap(),
    ];
    let atlas = atlas_with(regions, Vec::new());

    let history = atlas.history(5.0, 5.0);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].name, "Kingdom X");
    assert_eq!(history[0].valid_from, 100);
    assert_eq!(history[0].valid_to, 200);
    assert_eq!(history[0].area, 700.0);
    assert_eq!(atlas.founding_year("Kingdom X"), Some(100));
}

#[test]
fn test_load_and_query_from_geojson() {
    let regions_json = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"Name": "(Hegemony)", "FromYear": -300, "ToYear": 300, "Area": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[20,0],[20,10],[0,10],[0,0]]]}},
            {"type": "Feature",
             "properties": {"Name": "Satrapy", "FromYear": -300, "ToYear": 300, "Area": 800,
                            "MemberOf": "(Hegemony)"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature",
             "properties": {"Name": "Free City", "FromYear": -300, "ToYear": 300, "Area": 200},
             "geometry": {"type": "Polygon", "coordinates": [[[10,0],[20,0],[20,10],[10,10],[10,0]]]}}
        ]
    }"#;
    let cities_json = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"name": "Port", "populations": {"-200": 45000}},
             "geometry": {"type": "Point", "coordinates": [20.1, 5.0]}}
        ]
    }"#;
    let rivers_json = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"rivernum": 4, "scalerank": 1},
             "geometry": {"type": "LineString", "coordinates": [[2,5],[8,5]]}},
            {"type": "Feature", "properties": {"rivernum": 4, "scalerank": 1},
             "geometry": {"type": "LineString", "coordinates": [[12,5],[18,5]]}}
        ]
    }"#;

    let atlas = Atlas::new(
        EngineConfig::default(),
        Datasets {
            regions: loader::parse_regions(regions_json).unwrap().items,
            cities: loader::parse_cities(cities_json).unwrap().items,
            rivers: loader::parse_rivers(rivers_json).unwrap().items,
            world_stats: WorldStatSeries::default(),
        },
    );

    let region = atlas.region_at(5.0, 5.0, 0).unwrap();
    assert_eq!(region.name(), "Satrapy");
    assert_eq!(atlas.display_name(region), "Satrapy (Hegemony)");

    let cities = atlas.cities_at(0, CityDensity::Normal);
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].region.as_deref(), Some("Free City"));

    let crossed: Vec<&str> = atlas
        .regions_along_river_system(4, 0)
        .iter()
        .map(|r| r.name())
        .collect();
    assert_eq!(crossed, vec!["Satrapy", "Free City"]);

    let metrics = atlas.year_metrics(0);
    assert_eq!(metrics.totals.civilizations, 2);
    assert_eq!(metrics.totals.land_area, 1000.0);
    assert_eq!(metrics.totals.largest_empire_name.as_deref(), Some("Satrapy"));
}

#[test]
fn test_precompute_in_batches() {
    let regions = vec![
        Region::new("A", -1000, 1000, 10.0, rect(0.0, 0.0, 1.0, 1.0)).unwrap(),
        Region::new("B", 0, 1000, 20.0, rect(2.0, 2.0, 3.0, 3.0)).unwrap(),
    ];
    let atlas = atlas_with(regions, Vec::new());

    let plan = PrecomputePlan::new(-1000, 1000).with_stride(100).with_batch_size(8);
    let mut progress = PrecomputeProgress::new(plan);

    let mut steps = 1;
    while progress.step(&atlas) {
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(progress.completed(), 21);
    assert!(progress.is_finished());
    assert_eq!(atlas.metrics_cache().computed_len(), 21);

    let series = atlas.trend_series(plan.years());
    assert_eq!(series.len(), 21);
    assert_eq!(series[0].1.civilizations, 1);
    assert_eq!(series[20].1.land_area, 30.0);
    assert_eq!(atlas.metrics_cache().computed_len(), 21);

    let stacked = atlas.stacked_series([-500, 500], 1);
    assert_eq!(stacked.entities.len(), 1);
    assert_eq!(stacked.entities[0].name, "B");
    assert_eq!(stacked.entities[0].areas, vec![0.0, 20.0]);
    assert_eq!(stacked.other, vec![10.0, 10.0]);
}

#[test]
fn test_partial_datasets_still_answer() {
    let atlas = atlas_with(Vec::new(), Vec::new());
    assert!(atlas.region_at(0.0, 0.0, 0).is_none());
    assert!(atlas.history(0.0, 0.0).is_empty());
    assert!(atlas.world_stat_at(0).is_none());
    assert_eq!(atlas.year_metrics(0).totals.civilizations, 0);
    assert_eq!(atlas.info().year_span, None);
}
