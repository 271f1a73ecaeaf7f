//! Aggregate world metrics per year
//!
//! This module computes the world totals shown in rankings and trend charts, keeps an
//! append-only cache of them keyed by year, and drives chunked precompute passes over a
//! year stride.

use crate::continuity::FoundingYearIndex;
use crate::palette::{ColorHash, Palette};
use crate::temporal::ResolverPolicy;
use crate::{Atlas, City, Region, Year};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// World totals at one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTotals {
    /// Distinct entity names visible
    pub civilizations: usize,
    /// Sum of every visible fragment's area (km²)
    pub land_area: f64,
    /// Cities with a resolved population
    pub cities: usize,
    pub urban_population: u64,
    /// Largest single-entity area, fragments summed (km²)
    pub largest_empire: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub largest_empire_name: Option<String>,
    /// Mean years since founding over distinct visible names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_age: Option<f64>,
}

/// Per-entity figures for stacking and ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBreakdown {
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founding_year: Option<Year>,
    pub color_seed: u32,
    /// 1-based rank by area, ties broken by name
    pub rank: usize,
}

/// Totals and breakdown for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearMetrics {
    pub year: Year,
    pub totals: YearTotals,
    pub breakdown: BTreeMap<String, EntityBreakdown>,
}

impl YearMetrics {
    /// Entity names ordered by rank
    pub fn ranking(&self) -> Vec<(&str, &EntityBreakdown)> {
        let mut ranked: Vec<(&str, &EntityBreakdown)> = self
            .breakdown
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
            .collect();
        ranked.sort_by_key(|(_, entry)| entry.rank);
        ranked
    }
}

/// Compute the totals for `year` from the visible regions and all cities
///
/// # Arguments
/// * `visible` - Regions visible at `year`
/// * `cities` - Every city; those resolving to no population at `year` are skipped
/// * `founding` - Founding years over the full region dataset
pub fn compute_year_metrics(
    year: Year,
    visible: &[&Region],
    cities: &[City],
    founding: &FoundingYearIndex,
    policy: &ResolverPolicy,
    color_hash: ColorHash,
) -> YearMetrics {
    #[cfg(feature = "profiling")]
    profiling::scope!("metrics::compute_year_metrics");

    let land_area: f64 = visible.iter().map(|r| r.area()).sum();

    let mut per_entity: HashMap<&str, f64> = HashMap::new();
    for region in visible {
        *per_entity.entry(region.name()).or_insert(0.0) += region.area();
    }

    let mut ranked: Vec<(&str, f64)> = per_entity.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let ages: Vec<i64> = ranked
        .iter()
        .filter_map(|(name, _)| founding.age_at(name, year))
        .collect();
    let average_age =
        (!ages.is_empty()).then(|| ages.iter().sum::<i64>() as f64 / ages.len() as f64);

    let (cities_count, urban_total) = cities
        .iter()
        .filter_map(|city| city.population_at(year, policy))
        .fold((0usize, 0.0f64), |(count, total), resolved| {
            (count + 1, total + resolved.value)
        });

    let breakdown: BTreeMap<String, EntityBreakdown> = ranked
        .iter()
        .enumerate()
        .map(|(i, (name, area))| {
            (
                name.to_string(),
                EntityBreakdown {
                    area: *area,
                    founding_year: founding.get(name),
                    color_seed: color_hash.hash(name),
                    rank: i + 1,
                },
            )
        })
        .collect();

    let totals = YearTotals {
        civilizations: ranked.len(),
        land_area,
        cities: cities_count,
        urban_population: urban_total.round() as u64,
        largest_empire: ranked.first().map_or(0.0, |(_, area)| *area),
        largest_empire_name: ranked.first().map(|(name, _)| name.to_string()),
        average_age,
    };

    tracing::debug!(
        "Metrics at {year}: {} civilizations, {} cities",
        totals.civilizations,
        totals.cities
    );

    YearMetrics {
        year,
        totals,
        breakdown,
    }
}

/// Lifecycle of one cached year
#[derive(Debug, Clone, Default)]
pub enum SnapshotState {
    #[default]
    Uncomputed,
    Computing,
    Computed(Arc<YearMetrics>),
}

/// Append-only metrics cache keyed by year
///
/// A year moves `Uncomputed -> Computing -> Computed` once and is never recomputed.
#[derive(Debug, Default)]
pub struct MetricsCache {
    snapshots: DashMap<Year, SnapshotState>,
}

impl MetricsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, year: Year) -> SnapshotState {
        self.snapshots
            .get(&year)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Cached snapshot, if `year` has been computed
    pub fn get(&self, year: Year) -> Option<Arc<YearMetrics>> {
        self.snapshots.get(&year).and_then(|entry| match entry.value() {
            SnapshotState::Computed(metrics) => Some(Arc::clone(metrics)),
            _ => None,
        })
    }

    /// Cached snapshot for `year`, running `compute` only if it is not there yet
    pub fn get_or_compute(
        &self,
        year: Year,
        compute: impl FnOnce() -> YearMetrics,
    ) -> Arc<YearMetrics> {
        if let Some(metrics) = self.get(year) {
            return metrics;
        }

        self.snapshots.insert(year, SnapshotState::Computing);
        let metrics = Arc::new(compute());
        self.snapshots
            .insert(year, SnapshotState::Computed(Arc::clone(&metrics)));
        metrics
    }

    pub fn computed_len(&self) -> usize {
        self.snapshots
            .iter()
            .filter(|entry| matches!(entry.value(), SnapshotState::Computed(_)))
            .count()
    }
}

/// Years to precompute and how to slice the work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecomputePlan {
    pub start: Year,
    pub end: Year,
    pub stride: u32,
    /// Years computed per step before yielding
    pub batch_size: usize,
}

impl PrecomputePlan {
    pub fn new(start: Year, end: Year) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            stride: 50,
            batch_size: 8,
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Every planned year, `start` first; `end` is included only when on the stride
    pub fn years(&self) -> impl Iterator<Item = Year> + use<> {
        let end = self.end as i64;
        (self.start as i64..=end)
            .step_by(self.stride.max(1) as usize)
            .map(|year| year as Year)
    }

    pub fn year_count(&self) -> usize {
        ((self.end as i64 - self.start as i64) / self.stride.max(1) as i64 + 1) as usize
    }
}

/// Resumable precompute pass; abandon it by dropping it
#[derive(Debug, Clone)]
pub struct PrecomputeProgress {
    plan: PrecomputePlan,
    pending: VecDeque<Year>,
    completed: usize,
}

impl PrecomputeProgress {
    pub fn new(plan: PrecomputePlan) -> Self {
        Self {
            plan,
            pending: plan.years().collect(),
            completed: 0,
        }
    }

    /// Compute the next batch of years
    ///
    /// # Returns
    /// `true` while years remain for a later step
    pub fn step(&mut self, atlas: &Atlas) -> bool {
        let batch = self.plan.batch_size.max(1).min(self.pending.len());
        for year in self.pending.drain(..batch) {
            atlas.year_metrics(year);
            self.completed += 1;
        }

        tracing::debug!(
            "Precompute step: {}/{} years",
            self.completed,
            self.plan.year_count()
        );
        !self.pending.is_empty()
    }

    #[inline]
    pub fn plan(&self) -> &PrecomputePlan {
        &self.plan
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.completed
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

/// One entity's area over a series of years
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedEntity {
    pub name: String,
    pub color: String,
    /// Area per year of the series, 0 where the entity is not visible
    pub areas: Vec<f64>,
}

/// Per-entity areas of the largest entities, ready for a stacked chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedSeries {
    pub years: Vec<Year>,
    pub entities: Vec<StackedEntity>,
    /// Area of every other entity, per year
    pub other: Vec<f64>,
}

/// Stack the `top_n` entities with the largest peak area over the snapshots
pub fn stack_entities(
    snapshots: &[Arc<YearMetrics>],
    top_n: usize,
    palette: Palette,
) -> StackedSeries {
    let mut peaks: HashMap<&str, (f64, u32)> = HashMap::new();
    for snapshot in snapshots {
        for (name, entry) in &snapshot.breakdown {
            let peak = peaks.entry(name.as_str()).or_insert((0.0, entry.color_seed));
            peak.0 = peak.0.max(entry.area);
        }
    }

    let mut chosen: Vec<(&str, (f64, u32))> = peaks.into_iter().collect();
    chosen.sort_by(|a, b| b.1.0.total_cmp(&a.1.0).then_with(|| a.0.cmp(b.0)));
    chosen.truncate(top_n);

    let entities: Vec<StackedEntity> = chosen
        .iter()
        .map(|(name, (_, seed))| StackedEntity {
            name: name.to_string(),
            color: palette.color_for(*seed).to_string(),
            areas: snapshots
                .iter()
                .map(|s| s.breakdown.get(*name).map_or(0.0, |e| e.area))
                .collect(),
        })
        .collect();

    let other = snapshots
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let stacked: f64 = entities.iter().map(|e| e.areas[i]).sum();
            (s.totals.land_area - stacked).max(0.0)
        })
        .collect();

    StackedSeries {
        years: snapshots.iter().map(|s| s.year).collect(),
        entities,
        other,
    }
}
