//! Region storage module
//!
//! This module provides the `Region` struct: one time-bounded boundary record of a
//! historical polity, with its bounding box precomputed for cheap pre-filtering.

use crate::geometry::{self, BoundingBox};
use crate::visibility::{Temporal, is_composite_name};
use crate::{AtlasError, Result, Year};
use geo::{Coord, Geometry};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A single fragment of a named polity
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    valid_from: Year,
    valid_to: Year,
    /// Area in km² as supplied by the dataset
    area: f64,
    geometry: Geometry<f64>,
    /// Raw semicolon-delimited parent references
    member_of: Option<String>,
    wikipedia: Option<String>,
    /// Precomputed bounding box (None for empty geometry)
    bounding_box: Option<BoundingBox>,
}

/// Plain-data view of a region for callers outside the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub name: String,
    pub display_name: String,
    pub valid_from: Year,
    pub valid_to: Year,
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<(f64, f64)>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Region {
    /// Create a new region fragment
    ///
    /// # Returns
    /// The region, or an error if `valid_from > valid_to`
    pub fn new(
        name: impl Into<String>,
        valid_from: Year,
        valid_to: Year,
        area: f64,
        geometry: Geometry<f64>,
    ) -> Result<Self> {
        if valid_from > valid_to {
            return Err(AtlasError::InvalidInterval {
                from: valid_from,
                to: valid_to,
            });
        }

        let bounding_box = geometry::bounding_box(&geometry);

        Ok(Self {
            name: name.into(),
            valid_from,
            valid_to,
            area: if area.is_finite() { area.max(0.0) } else { 0.0 },
            geometry,
            member_of: None,
            wikipedia: None,
            bounding_box,
        })
    }

    /// Attach the raw `MemberOf` parent references
    pub fn with_member_of(mut self, member_of: Option<String>) -> Self {
        self.member_of = member_of.filter(|m| !m.trim().is_empty());
        self
    }

    /// Attach the external encyclopedia key
    pub fn with_wikipedia(mut self, wikipedia: Option<String>) -> Self {
        self.wikipedia = wikipedia.filter(|w| !w.trim().is_empty());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.area
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
    pub fn member_of(&self) -> Option<&str> {
        self.member_of.as_deref()
    }

    #[inline]
    pub fn wikipedia(&self) -> Option<&str> {
        self.wikipedia.as_deref()
    }

    /// Whether this record is a parenthesised composite wrapper
    #[inline]
    pub fn is_composite(&self) -> bool {
        is_composite_name(&self.name)
    }

    /// Parent references split on `;`, trimmed, empties dropped
    pub fn parent_refs(&self) -> SmallVec<[&str; 2]> {
        self.member_of
            .as_deref()
            .map(|refs| {
                refs.split(';')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Point containment with the bounding box as pre-filter
    ///
    /// `tolerance` (degrees) widens both the pre-filter and the edge acceptance band.
    pub fn contains(&self, lon: f64, lat: f64, tolerance: f64) -> bool {
        match self.bounding_box {
            Some(bbox) if bbox.expanded(tolerance.max(0.0)).contains(lon, lat) => {
                geometry::point_in_geometry(lon, lat, &self.geometry, tolerance)
            }
            _ => false,
        }
    }

    /// Label anchor: the approximate pole of inaccessibility of the largest part
    pub fn label_position(&self, grid: usize) -> Option<Coord<f64>> {
        geometry::visual_center(&self.geometry, grid)
    }

    /// Plain-data summary with a resolved display name
    pub fn summary(&self, grid: usize) -> RegionSummary {
        RegionSummary {
            name: self.name.clone(),
            display_name: crate::continuity::display_name(self),
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            area: self.area,
            member_of: self.member_of.clone(),
            wikipedia: self.wikipedia.clone(),
            label_position: self.label_position(grid).map(|c| (c.x, c.y)),
        }
    }
}

impl Temporal for Region {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn valid_from(&self) -> Year {
        self.valid_from
    }

    #[inline]
    fn valid_to(&self) -> Year {
        self.valid_to
    }
}
