//! Linear hydrological features and their grouping into river systems

use crate::geometry::{self, BoundingBox};
use crate::{AtlasError, Result};
use geo::{Coord, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// One river, tributary or lake-centerline segment
#[derive(Clone, Debug)]
pub struct LinearFeature {
    geometry: Geometry<f64>,
    /// Links segments of one connected system
    pub group_id: Option<i64>,
    /// Significance for level-of-detail filtering (0 = most significant)
    pub rank: u8,
    pub name: Option<String>,
    bounding_box: Option<BoundingBox>,
}

impl LinearFeature {
    /// Create a feature from a LineString or MultiLineString
    pub fn new(geometry: Geometry<f64>, group_id: Option<i64>, rank: u8) -> Result<Self> {
        if geometry::line_parts(&geometry).is_empty() {
            return Err(AtlasError::InvalidGeometry(
                "linear feature needs a LineString or MultiLineString".to_string(),
            ));
        }
        let bounding_box = geometry::bounding_box(&geometry);
        Ok(Self {
            geometry,
            group_id,
            rank,
            name: None,
            bounding_box,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    #[inline]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    #[inline]
    pub fn length_km(&self) -> f64 {
        geometry::polyline_length_km(&self.geometry)
    }

    /// Planar distance in degrees from a point to the nearest segment
    pub fn distance_to(&self, lon: f64, lat: f64) -> f64 {
        geometry::distance_to_polyline(Coord { x: lon, y: lat }, &self.geometry)
    }
}

/// How much hydrological detail to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Major,
    #[default]
    Standard,
    Full,
}

impl DetailLevel {
    /// Largest `rank` shown at this level
    pub fn max_rank(&self) -> u8 {
        match self {
            Self::Major => 3,
            Self::Standard => 6,
            Self::Full => u8::MAX,
        }
    }

    #[inline]
    pub fn includes(&self, feature: &LinearFeature) -> bool {
        feature.rank <= self.max_rank()
    }

    pub fn all() -> &'static [Self] {
        &[Self::Major, Self::Standard, Self::Full]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Standard => "standard",
            Self::Full => "full",
        }
    }
}

impl FromStr for DetailLevel {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AtlasError::UnknownVariant {
                kind: "detail level",
                name: s.to_string(),
            })
    }
}

/// A connected set of segments sharing a group id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverSystem {
    /// `None` for a standalone segment
    pub group_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indices into the feature collection, in source order
    pub segments: Vec<usize>,
    pub length_km: f64,
    /// First vertex of the first segment
    pub start: Option<(f64, f64)>,
    /// Last vertex of the last segment
    pub end: Option<(f64, f64)>,
    /// Most significant rank among the segments
    pub rank: u8,
}

/// Group features into systems in order of first appearance
///
/// Ungrouped features each form a system of their own.
pub fn group_systems(features: &[LinearFeature]) -> Vec<RiverSystem> {
    let mut systems: Vec<RiverSystem> = Vec::new();
    let mut by_group: HashMap<i64, usize> = HashMap::new();

    for (index, feature) in features.iter().enumerate() {
        let slot = match feature.group_id {
            Some(group) => *by_group.entry(group).or_insert_with(|| {
                systems.push(empty_system(Some(group)));
                systems.len() - 1
            }),
            None => {
                systems.push(empty_system(None));
                systems.len() - 1
            }
        };

        let system = &mut systems[slot];
        system.segments.push(index);
        system.length_km += feature.length_km();
        system.rank = system.rank.min(feature.rank);
        if system.name.is_none() {
            system.name = feature.name.clone();
        }
        if let Some((first, last)) = geometry::polyline_endpoints(feature.geometry()) {
            if system.start.is_none() {
                system.start = Some((first.x, first.y));
            }
            system.end = Some((last.x, last.y));
        }
    }

    systems
}

fn empty_system(group_id: Option<i64>) -> RiverSystem {
    RiverSystem {
        group_id,
        name: None,
        segments: Vec::new(),
        length_km: 0.0,
        start: None,
        end: None,
        rank: u8::MAX,
    }
}

/// Features passing within `radius` degrees of a point, nearest first
///
/// # Returns
/// `(feature index, distance in degrees)` pairs; equal distances keep source order
pub fn features_near(
    features: &[LinearFeature],
    lon: f64,
    lat: f64,
    radius: f64,
) -> Vec<(usize, f64)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("river::features_near");

    let mut hits: Vec<(usize, f64)> = features
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.bounding_box()
                .is_some_and(|bbox| bbox.expanded(radius).contains(lon, lat))
        })
        .map(|(i, f)| (i, f.distance_to(lon, lat)))
        .filter(|(_, distance)| *distance <= radius)
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}
