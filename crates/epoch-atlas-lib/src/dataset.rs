//! Atlas - Immutable engine snapshot over the loaded datasets
//!
//! This module provides the high-level query API: every spatial, temporal and
//! aggregate question the map asks goes through an [`Atlas`] built once from the
//! loaded collections. Reloading means building a new `Atlas`.

use crate::city::{City, CityAtYear, CityDensity};
use crate::continuity::{self, FoundingYearIndex, ReignInterval};
use crate::metrics::{self, MetricsCache, StackedSeries, YearMetrics, YearTotals};
use crate::palette::{ColorHash, Palette};
use crate::river::{self, DetailLevel, LinearFeature, RiverSystem};
use crate::spatial;
use crate::temporal::{ResolvedValue, ResolverPolicy};
use crate::visibility::{self, Temporal};
use crate::world_stats::{WorldStat, WorldStatSeries};
use crate::{Region, RegionSummary, Year};
use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Degrees a city may sit outside a coastline and still belong to the region.
    /// Default: 0.15 (about 16 km)
    pub city_tolerance: f64,
    /// Largest gap in years between same-name fragments merged into one reign
    pub merge_gap: u32,
    /// Vertices sampled from a line when joining it against regions
    pub line_samples: usize,
    /// Perimeter points sampled for adjacency
    pub perimeter_samples: usize,
    /// Offset in degrees of the adjacency probes and bbox pre-filter
    pub adjacency_buffer: f64,
    /// Lattice size used to place region labels
    pub visual_grid: usize,
    pub resolver: ResolverPolicy,
    pub color_hash: ColorHash,
    pub palette: Palette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            city_tolerance: 0.15,
            merge_gap: 5,
            line_samples: 20,
            perimeter_samples: 50,
            adjacency_buffer: 0.1,
            visual_grid: 8,
            resolver: ResolverPolicy::default(),
            color_hash: ColorHash::default(),
            palette: Palette::default(),
        }
    }
}

/// Raw collections handed to [`Atlas::new`]
///
/// Any collection may be empty when its source failed to load.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub regions: Vec<Region>,
    pub cities: Vec<City>,
    pub rivers: Vec<LinearFeature>,
    pub world_stats: WorldStatSeries,
}

/// Information about the loaded snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtlasInfo {
    /// Number of region fragments, composites included
    pub region_count: usize,
    /// Distinct non-composite entity names
    pub entity_count: usize,
    pub city_count: usize,
    pub river_count: usize,
    pub river_system_count: usize,
    pub world_stat_count: usize,
    /// Earliest `valid_from` and latest `valid_to` over all regions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_span: Option<(Year, Year)>,
    pub cached_years: usize,
}

/// Immutable snapshot of every dataset plus derived indices and caches
#[derive(Debug)]
pub struct Atlas {
    config: EngineConfig,
    regions: Vec<Region>,
    cities: Vec<City>,
    rivers: Vec<LinearFeature>,
    river_systems: Vec<RiverSystem>,
    world_stats: WorldStatSeries,
    /// Built once over the full region dataset
    founding: FoundingYearIndex,
    metrics: MetricsCache,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Atlas {
    /// Build the snapshot and its derived indices
    pub fn new(config: EngineConfig, datasets: Datasets) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("atlas::new");

        let Datasets {
            regions,
            cities,
            rivers,
            world_stats,
        } = datasets;

        let founding = FoundingYearIndex::build(&regions);
        let river_systems = river::group_systems(&rivers);

        let atlas = Self {
            config,
            regions,
            cities,
            rivers,
            river_systems,
            world_stats,
            founding,
            metrics: MetricsCache::new(),
        };

        let info = atlas.info();
        tracing::info!(
            "Atlas ready: {} regions ({} entities), {} cities, {} rivers in {} systems, {} world samples",
            info.region_count,
            info.entity_count,
            info.city_count,
            info.river_count,
            info.river_system_count,
            info.world_stat_count
        );
        atlas
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[inline]
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    #[inline]
    pub fn rivers(&self) -> &[LinearFeature] {
        &self.rivers
    }

    #[inline]
    pub fn metrics_cache(&self) -> &MetricsCache {
        &self.metrics
    }

    pub fn info(&self) -> AtlasInfo {
        let year_span = self
            .regions
            .iter()
            .map(|r| (r.valid_from(), r.valid_to()))
            .reduce(|(from, to), (f, t)| (from.min(f), to.max(t)));

        AtlasInfo {
            region_count: self.regions.len(),
            entity_count: self.founding.len(),
            city_count: self.cities.len(),
            river_count: self.rivers.len(),
            river_system_count: self.river_systems.len(),
            world_stat_count: self.world_stats.len(),
            year_span,
            cached_years: self.metrics.computed_len(),
        }
    }

    // --- Regions ---

    /// Non-composite regions valid at `year`, in dataset order
    pub fn visible_at(&self, year: Year) -> Vec<&Region> {
        visibility::visible_at(year, &self.regions)
    }

    pub fn region_at(&self, lon: f64, lat: f64, year: Year) -> Option<&Region> {
        spatial::region_at(lon, lat, year, &self.regions)
    }

    /// Region a city belongs to, with the configured coastline tolerance
    pub fn city_region(&self, lon: f64, lat: f64, year: Year) -> Option<&Region> {
        spatial::city_region(lon, lat, &self.visible_at(year), self.config.city_tolerance)
    }

    pub fn regions_along_line(&self, line: &Geometry<f64>, year: Year) -> Vec<&Region> {
        spatial::regions_along_line(line, &self.visible_at(year), self.config.line_samples)
    }

    pub fn regions_adjacent_to_area(&self, area: &Geometry<f64>, year: Year) -> Vec<&Region> {
        spatial::regions_adjacent_to_area(
            area,
            &self.visible_at(year),
            self.config.perimeter_samples,
            self.config.adjacency_buffer,
        )
    }

    /// Entities bordering every visible fragment of `name`, one region per entity
    pub fn neighbours(&self, name: &str, year: Year) -> Vec<&Region> {
        let visible = self.visible_at(year);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut neighbours = Vec::new();

        for fragment in visible.iter().filter(|r| r.name() == name) {
            let adjacent = spatial::regions_adjacent_to_area(
                fragment.geometry(),
                &visible,
                self.config.perimeter_samples,
                self.config.adjacency_buffer,
            );
            for region in adjacent {
                if region.name() != name && seen.insert(region.name()) {
                    neighbours.push(region);
                }
            }
        }
        neighbours
    }

    /// Label for a region, combined with its parent entity when it has one
    #[inline]
    pub fn display_name(&self, region: &Region) -> String {
        continuity::display_name(region)
    }

    pub fn summary(&self, region: &Region) -> RegionSummary {
        region.summary(self.config.visual_grid)
    }

    /// Fill colour of an entity under the configured hash and palette
    pub fn color_for(&self, name: &str) -> &'static str {
        self.config
            .palette
            .color_for(self.config.color_hash.hash(name))
    }

    // --- Continuity ---

    pub fn history(&self, lon: f64, lat: f64) -> Vec<ReignInterval> {
        continuity::history(lon, lat, &self.regions, self.config.merge_gap)
    }

    #[inline]
    pub fn founding_year(&self, name: &str) -> Option<Year> {
        self.founding.get(name)
    }

    // --- Cities ---

    /// First city with this name or alternate name
    pub fn find_city(&self, name: &str) -> Option<&City> {
        self.cities
            .iter()
            .find(|c| c.name == name || c.other_name.as_deref() == Some(name))
    }

    pub fn resolve_population(&self, city: &str, year: Year) -> Option<ResolvedValue> {
        self.find_city(city)?
            .population_at(year, &self.config.resolver)
    }

    /// Cities shown at `year` under a display density, largest first
    ///
    /// Each city is joined to the region it lies in, if any.
    pub fn cities_at(&self, year: Year, density: CityDensity) -> Vec<CityAtYear> {
        #[cfg(feature = "profiling")]
        profiling::scope!("atlas::cities_at");

        let visible = self.visible_at(year);
        let min_population = density.min_population();

        let mut shown: Vec<CityAtYear> = self
            .cities
            .iter()
            .filter_map(|city| {
                let estimate = city.population_at(year, &self.config.resolver)?;
                let population = estimate.value.round() as u64;
                (population >= min_population).then(|| CityAtYear {
                    name: city.name.clone(),
                    other_name: city.other_name.clone(),
                    lon: city.lon,
                    lat: city.lat,
                    population,
                    estimate,
                    region: spatial::city_region(
                        city.lon,
                        city.lat,
                        &visible,
                        self.config.city_tolerance,
                    )
                    .map(|r| r.name().to_string()),
                })
            })
            .collect();

        shown.sort_by(|a, b| b.population.cmp(&a.population));
        shown
    }

    // --- Rivers ---

    /// Features within `radius` degrees of the point, nearest first
    pub fn rivers_near(
        &self,
        lon: f64,
        lat: f64,
        radius: f64,
        detail: DetailLevel,
    ) -> Vec<(&LinearFeature, f64)> {
        river::features_near(&self.rivers, lon, lat, radius)
            .into_iter()
            .map(|(index, distance)| (&self.rivers[index], distance))
            .filter(|(feature, _)| detail.includes(feature))
            .collect()
    }

    #[inline]
    pub fn river_systems(&self) -> &[RiverSystem] {
        &self.river_systems
    }

    pub fn river_system(&self, group_id: i64) -> Option<&RiverSystem> {
        self.river_systems
            .iter()
            .find(|s| s.group_id == Some(group_id))
    }

    /// Regions crossed by any segment of a river system, first-seen order
    pub fn regions_along_river_system(&self, group_id: i64, year: Year) -> Vec<&Region> {
        let Some(system) = self.river_system(group_id) else {
            return Vec::new();
        };
        let visible = self.visible_at(year);

        let mut seen: HashSet<*const Region> = HashSet::new();
        let mut crossed = Vec::new();
        for &index in &system.segments {
            let line = self.rivers[index].geometry();
            for region in spatial::regions_along_line(line, &visible, self.config.line_samples) {
                if seen.insert(region as *const Region) {
                    crossed.push(region);
                }
            }
        }
        crossed
    }

    // --- World statistics ---

    #[inline]
    pub fn world_stat_at(&self, year: Year) -> Option<WorldStat> {
        self.world_stats.at(year)
    }

    // --- Metrics ---

    /// World totals at `year`, computed once and cached for the snapshot's lifetime
    pub fn year_metrics(&self, year: Year) -> Arc<YearMetrics> {
        self.metrics.get_or_compute(year, || {
            metrics::compute_year_metrics(
                year,
                &self.visible_at(year),
                &self.cities,
                &self.founding,
                &self.config.resolver,
                self.config.color_hash,
            )
        })
    }

    /// Totals per year in the given order, computing any year not cached yet
    pub fn trend_series(&self, years: impl IntoIterator<Item = Year>) -> Vec<(Year, YearTotals)> {
        years
            .into_iter()
            .map(|year| (year, self.year_metrics(year).totals.clone()))
            .collect()
    }

    /// Areas of the `top_n` largest entities over the given years
    pub fn stacked_series(
        &self,
        years: impl IntoIterator<Item = Year>,
        top_n: usize,
    ) -> StackedSeries {
        let snapshots: Vec<Arc<YearMetrics>> =
            years.into_iter().map(|year| self.year_metrics(year)).collect();
        metrics::stack_entities(&snapshots, top_n, self.config.palette)
    }
}
