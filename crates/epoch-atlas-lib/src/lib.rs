//! Epoch Atlas Library - Temporal Geospatial Query Engine
//!
//! This library answers the questions a time-scrubbable historical map asks of its data:
//! which polity controls a location in a given year, which cities exist and how large they
//! are, which rivers pass nearby, how an entity's fragmented records join into continuous
//! reigns, and what the world totals look like at any year of a 5,000+ year timeline.
//!
//! # Architecture
//!
//! - **[`geometry`]**: Pure planar kernel (point-in-polygon, centroids, bounding boxes, distances)
//! - **[`resolve_value_for_year`]**: Tiered estimation over sparse year→value series
//! - **[`visible_at`]**: Validity-interval filter excluding composite wrapper records
//! - **[`spatial`]**: Point and line joins against the visible region set
//! - **[`continuity`]**: Founding years, reign merging and display names
//! - **[`metrics`]**: Per-year world totals with an append-only cache
//! - **[`Atlas`]**: Immutable snapshot tying the collections and caches together
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(N) over all fragments (founding index), parsing is parallel
//! - **Point Query Time**: O(V × E) where V=visible fragments, E=edges tested after bbox pre-filter
//! - **Year Metrics**: O(V + C) per year (C=cities), O(1) once cached

pub mod city;
pub mod continuity;
mod dataset;
pub mod geometry;
pub mod loader;
pub mod metrics;
pub mod palette;
mod region;
pub mod river;
pub mod spatial;
mod temporal;
mod visibility;
mod world_stats;

/// Calendar year; negative values are BCE.
pub type Year = i32;

// Public API exports
pub use city::{City, CityAtYear, CityDensity};
pub use continuity::{FoundingYearIndex, ReignInterval};
pub use dataset::{Atlas, AtlasInfo, Datasets, EngineConfig};
pub use metrics::{
    EntityBreakdown, MetricsCache, PrecomputePlan, PrecomputeProgress, SnapshotState,
    StackedEntity, StackedSeries, YearMetrics, YearTotals,
};
pub use palette::{ColorHash, Palette};
pub use region::{Region, RegionSummary};
pub use river::{DetailLevel, LinearFeature, RiverSystem};
pub use temporal::{AttestedRange, Confidence, ResolvedValue, ResolverPolicy, resolve_value_for_year};
pub use visibility::{Temporal, is_composite_name, visible_at};
pub use world_stats::{WorldStat, WorldStatSeries};

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid interval: from {from} is after to {to}")]
    InvalidInterval { from: Year, to: Year },

    #[error("No data for {0}")]
    MissingData(String),

    #[error("Invalid feature #{index}: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Unknown {kind}: {name}")]
    UnknownVariant { kind: &'static str, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
