//! Concurrent dataset loading behind a single barrier
//!
//! Every file is read by its own task and parsed on the blocking pool. All tasks
//! are joined before anything is assembled, so the engine is only ever built from
//! a complete load pass. A source that fails is reported as unavailable and the
//! remaining collections still make up the engine.

use crate::error::{AppError, Result};
use crate::runtime;
use epoch_atlas_lib::loader::{self, ParsedCollection};
use epoch_atlas_lib::{City, Datasets, LinearFeature, Region, WorldStatSeries, Year, city};
use serde::Serialize;
use std::path::PathBuf;

/// Files making up one load pass
#[derive(Debug, Clone, Default)]
pub struct DataPaths {
    /// Region part files, in part order
    pub regions: Vec<PathBuf>,
    pub cities: Option<PathBuf>,
    pub secondary_cities: Option<PathBuf>,
    pub prefer_secondary_before: Year,
    pub rivers: Vec<PathBuf>,
    pub world_stats: Option<PathBuf>,
}

impl DataPaths {
    fn sources(&self) -> Vec<(PathBuf, SourceKind)> {
        let mut sources: Vec<(PathBuf, SourceKind)> = Vec::new();
        sources.extend(self.regions.iter().map(|p| (p.clone(), SourceKind::Regions)));
        sources.extend(self.cities.iter().map(|p| (p.clone(), SourceKind::Cities)));
        sources.extend(
            self.secondary_cities
                .iter()
                .map(|p| (p.clone(), SourceKind::SecondaryCities)),
        );
        sources.extend(self.rivers.iter().map(|p| (p.clone(), SourceKind::Rivers)));
        sources.extend(self.world_stats.iter().map(|p| (p.clone(), SourceKind::WorldStats)));
        sources
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Regions,
    Cities,
    SecondaryCities,
    Rivers,
    WorldStats,
}

/// Outcome of loading one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Records converted from the file
    pub records: usize,
    /// Features skipped as malformed
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStatus {
    #[inline]
    pub fn is_available(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-file outcome of a load pass, in the order the files were given
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceStatus>,
}

impl LoadReport {
    pub fn unavailable(&self) -> impl Iterator<Item = &SourceStatus> {
        self.sources.iter().filter(|s| !s.is_available())
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable().next().is_none()
    }

    pub fn skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }
}

enum Parsed {
    Regions(ParsedCollection<Region>),
    Cities(ParsedCollection<City>),
    Rivers(ParsedCollection<LinearFeature>),
    WorldStats(WorldStatSeries),
}

impl Parsed {
    fn counts(&self) -> (usize, usize) {
        match self {
            Parsed::Regions(c) => (c.items.len(), c.skipped),
            Parsed::Cities(c) => (c.items.len(), c.skipped),
            Parsed::Rivers(c) => (c.items.len(), c.skipped),
            Parsed::WorldStats(series) => (series.len(), 0),
        }
    }
}

fn parse(kind: SourceKind, text: &str) -> epoch_atlas_lib::Result<Parsed> {
    Ok(match kind {
        SourceKind::Regions => Parsed::Regions(loader::parse_regions(text)?),
        SourceKind::Cities | SourceKind::SecondaryCities => {
            Parsed::Cities(loader::parse_cities(text)?)
        }
        SourceKind::Rivers => Parsed::Rivers(loader::parse_rivers(text)?),
        SourceKind::WorldStats => Parsed::WorldStats(loader::parse_world_stats(text)?),
    })
}

async fn load_source(path: PathBuf, kind: SourceKind) -> Result<Parsed> {
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| AppError::Read {
            path: path.clone(),
            source,
        })?;

    let parsed = tokio::task::spawn_blocking(move || parse(kind, &text)).await??;
    Ok(parsed)
}

/// Load every configured file concurrently and assemble the datasets
///
/// Region and river parts are concatenated in the order given, so source order
/// survives the concurrent load. Cities from a second source are merged into the
/// first; if only one city source loads, it is used alone.
///
/// # Returns
/// The assembled collections and the per-file report. Never fails as a whole.
pub async fn load_datasets(paths: &DataPaths) -> (Datasets, LoadReport) {
    #[cfg(feature = "profiling")]
    profiling::scope!("load::load_datasets");

    let handles: Vec<_> = paths
        .sources()
        .into_iter()
        .map(|(path, kind)| {
            let handle = runtime::spawn(load_source(path.clone(), kind));
            (path, kind, handle)
        })
        .collect();

    // Barrier: every task is joined before the collections are assembled
    let mut region_parts = Vec::new();
    let mut river_parts = Vec::new();
    let mut primary_cities: Option<Vec<City>> = None;
    let mut secondary_cities: Option<Vec<City>> = None;
    let mut world_stats = WorldStatSeries::default();
    let mut report = LoadReport::default();

    for (path, kind, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(AppError::from(join_error)),
        };

        match outcome {
            Ok(parsed) => {
                let (records, skipped) = parsed.counts();
                tracing::info!(
                    "Loaded {} records from {} ({} skipped)",
                    records,
                    path.display(),
                    skipped
                );
                report.sources.push(SourceStatus {
                    path,
                    kind,
                    records,
                    skipped,
                    error: None,
                });

                match parsed {
                    Parsed::Regions(part) => region_parts.push(part),
                    Parsed::Rivers(part) => river_parts.push(part),
                    Parsed::Cities(collection) if kind == SourceKind::SecondaryCities => {
                        secondary_cities = Some(collection.items)
                    }
                    Parsed::Cities(collection) => primary_cities = Some(collection.items),
                    Parsed::WorldStats(series) => world_stats = series,
                }
            }
            Err(e) => {
                tracing::warn!("Dataset {} unavailable: {}", path.display(), e);
                report.sources.push(SourceStatus {
                    path,
                    kind,
                    records: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let cities = match (primary_cities, secondary_cities) {
        (Some(primary), Some(secondary)) => {
            city::merge_city_sources(primary, secondary, paths.prefer_secondary_before)
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => Vec::new(),
    };

    let datasets = Datasets {
        regions: ParsedCollection::concat(region_parts).items,
        cities,
        rivers: ParsedCollection::concat(river_parts).items,
        world_stats,
    };

    if !report.is_complete() {
        tracing::warn!(
            "{} of {} dataset files unavailable; answering from the rest",
            report.unavailable().count(),
            report.sources.len()
        );
    }

    (datasets, report)
}
