//! Dataset parsing from GeoJSON and JSON sources
//!
//! Each collection is decoded once into raw features, which are then converted to
//! engine records in parallel. A feature that cannot be converted (missing name,
//! inverted interval, unsupported geometry) is skipped with a warning and counted;
//! it never fails the collection. Only a document that is not a valid collection at
//! all produces an error.

use crate::city::{City, parse_year_column};
use crate::river::LinearFeature;
use crate::world_stats::{WorldStat, WorldStatSeries};
use crate::{AtlasError, Region, Result, Year};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPolygon, Polygon};
use rayon::prelude::*;
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;

/// Records converted from one collection plus the number of features dropped
#[derive(Debug, Clone)]
pub struct ParsedCollection<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> ParsedCollection<T> {
    /// Concatenate part files in part order
    pub fn concat(parts: impl IntoIterator<Item = ParsedCollection<T>>) -> Self {
        parts.into_iter().fold(
            Self {
                items: Vec::new(),
                skipped: 0,
            },
            |mut acc, part| {
                acc.items.extend(part.items);
                acc.skipped += part.skipped;
                acc
            },
        )
    }
}

#[derive(Deserialize)]
struct RawCollection {
    /// Kept as raw text so one malformed feature only skips itself
    features: Vec<Box<RawValue>>,
}

#[derive(Deserialize)]
struct RawFeature<P> {
    properties: Option<P>,
    geometry: Option<RawGeometry>,
}

type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RegionProperties {
    name: Option<String>,
    from_year: Option<f64>,
    to_year: Option<f64>,
    area: Option<f64>,
    member_of: Option<String>,
    wikipedia: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityProperties {
    name: Option<String>,
    other_name: Option<String>,
    country: Option<String>,
    certainty: Option<f64>,
    #[serde(default, deserialize_with = "entries_in_order")]
    populations: Vec<(String, Option<f64>)>,
    min_year: Option<f64>,
    max_year: Option<f64>,
}

/// Object entries in document order, so a later key for the same year wins
fn entries_in_order<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, Option<f64>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(String, Option<f64>)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object of year keys to populations")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(Entries)
}

#[derive(Deserialize)]
struct RiverProperties {
    rivernum: Option<f64>,
    scalerank: Option<f64>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawWorldStat {
    year: f64,
    population: f64,
    gdp_per_capita: f64,
}

fn coord(position: &[f64]) -> Option<Coord<f64>> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn line(positions: &[Position]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let interiors = interiors
        .iter()
        .map(|ring| line(ring))
        .collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(line(exterior)?, interiors))
}

impl RawGeometry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::Unsupported => "unsupported",
        }
    }

    fn into_polygonal(self) -> std::result::Result<Geometry<f64>, String> {
        let converted = match &self {
            Self::Polygon { coordinates } => polygon(coordinates).map(Geometry::Polygon),
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Option<Vec<_>>>()
                .map(|parts| Geometry::MultiPolygon(MultiPolygon::new(parts))),
            _ => return Err(format!("expected a polygon, found {}", self.kind())),
        };
        converted.ok_or_else(|| "malformed polygon coordinates".to_string())
    }

    fn into_linear(self) -> std::result::Result<Geometry<f64>, String> {
        let converted = match &self {
            Self::LineString { coordinates } => line(coordinates).map(Geometry::LineString),
            Self::MultiLineString { coordinates } => coordinates
                .iter()
                .map(|l| line(l))
                .collect::<Option<Vec<_>>>()
                .map(|parts| Geometry::MultiLineString(MultiLineString::new(parts))),
            _ => return Err(format!("expected a line, found {}", self.kind())),
        };
        converted.ok_or_else(|| "malformed line coordinates".to_string())
    }

    fn into_point(self) -> std::result::Result<Coord<f64>, String> {
        match &self {
            Self::Point { coordinates } => {
                coord(coordinates).ok_or_else(|| "malformed point coordinates".to_string())
            }
            _ => Err(format!("expected a point, found {}", self.kind())),
        }
    }
}

#[inline]
fn round_year(value: f64) -> Option<Year> {
    (value.is_finite() && value.abs() <= Year::MAX as f64).then(|| value.round() as Year)
}

/// Decode a collection and convert its features in parallel, keeping source order
fn parse_features<P, T, F>(json: &str, label: &str, convert: F) -> Result<ParsedCollection<T>>
where
    P: DeserializeOwned,
    T: Send,
    F: Fn(Option<P>, Option<RawGeometry>) -> std::result::Result<T, String> + Sync,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("loader::parse_features");

    let collection: RawCollection = serde_json::from_str(json)?;

    let converted: Vec<Result<T>> = collection
        .features
        .into_par_iter()
        .enumerate()
        .map(|(index, raw)| {
            let invalid = |reason: String| AtlasError::InvalidFeature { index, reason };
            let feature: RawFeature<P> =
                serde_json::from_str(raw.get()).map_err(|e| invalid(e.to_string()))?;
            convert(feature.properties, feature.geometry).map_err(invalid)
        })
        .collect();

    let mut items = Vec::with_capacity(converted.len());
    let mut skipped = 0;
    for result in converted {
        match result {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!("Skipping {label} feature: {e}");
                skipped += 1;
            }
        }
    }

    tracing::info!("Parsed {} {label} features ({skipped} skipped)", items.len());
    Ok(ParsedCollection { items, skipped })
}

/// Parse a polygon collection (or one part file of it)
pub fn parse_regions(json: &str) -> Result<ParsedCollection<Region>> {
    parse_features(json, "region", |properties: Option<RegionProperties>, geometry| {
        let properties = properties.ok_or("missing properties")?;
        let name = properties
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or("missing Name")?;
        let from = properties
            .from_year
            .and_then(round_year)
            .ok_or("missing FromYear")?;
        let to = properties
            .to_year
            .and_then(round_year)
            .ok_or("missing ToYear")?;
        let geometry = geometry.ok_or("missing geometry")?.into_polygonal()?;

        Region::new(name, from, to, properties.area.unwrap_or(0.0), geometry)
            .map(|region| {
                region
                    .with_member_of(properties.member_of)
                    .with_wikipedia(properties.wikipedia)
            })
            .map_err(|e| e.to_string())
    })
}

/// Parse population keys: plain years (`"-3700"`) or wide-table headers (`"BC_3700"`)
fn population_year(key: &str) -> Option<Year> {
    key.trim()
        .parse::<Year>()
        .ok()
        .or_else(|| key.trim().parse::<f64>().ok().and_then(round_year))
        .or_else(|| parse_year_column(key))
}

/// Parse a city point collection
pub fn parse_cities(json: &str) -> Result<ParsedCollection<City>> {
    parse_features(json, "city", |properties: Option<CityProperties>, geometry| {
        let properties = properties.ok_or("missing properties")?;
        let name = properties
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or("missing name")?;
        let location = geometry.ok_or("missing geometry")?.into_point()?;

        // Aliases for one year collapse onto the last entry written
        let populations: BTreeMap<Year, u32> = properties
            .populations
            .iter()
            .filter_map(|(key, value)| {
                let year = population_year(key)?;
                let count = (*value)?;
                (count.is_finite() && count >= 1.0).then(|| (year, count.min(u32::MAX as f64) as u32))
            })
            .collect();

        let mut city = City::new(
            name,
            location.x,
            location.y,
            populations,
            properties.min_year.and_then(round_year),
            properties.max_year.and_then(round_year),
        )
        .map_err(|e| e.to_string())?;
        city.other_name = properties.other_name.filter(|n| !n.trim().is_empty());
        city.country = properties.country.filter(|c| !c.trim().is_empty());
        if let Some(certainty) = properties.certainty.filter(|c| c.is_finite()) {
            city.certainty = certainty.clamp(0.0, u8::MAX as f64) as u8;
        }
        Ok(city)
    })
}

/// Parse a river or lake-centerline collection
pub fn parse_rivers(json: &str) -> Result<ParsedCollection<LinearFeature>> {
    parse_features(json, "river", |properties: Option<RiverProperties>, geometry| {
        let geometry = geometry.ok_or("missing geometry")?.into_linear()?;
        let (group_id, rank, name) = match properties {
            Some(p) => (
                p.rivernum.filter(|n| n.is_finite()).map(|n| n as i64),
                p.scalerank
                    .filter(|r| r.is_finite())
                    .map_or(u8::MAX, |r| r.clamp(0.0, u8::MAX as f64) as u8),
                p.name,
            ),
            None => (None, u8::MAX, None),
        };

        LinearFeature::new(geometry, group_id, rank)
            .map(|feature| feature.with_name(name))
            .map_err(|e| e.to_string())
    })
}

/// Parse the world statistics array
pub fn parse_world_stats(json: &str) -> Result<WorldStatSeries> {
    let raw: Vec<RawWorldStat> = serde_json::from_str(json)?;
    let samples: Vec<WorldStat> = raw
        .into_iter()
        .filter_map(|s| {
            Some(WorldStat {
                year: round_year(s.year)?,
                population: s.population,
                gdp_per_capita: s.gdp_per_capita,
            })
        })
        .collect();

    tracing::info!("Parsed {} world statistic samples", samples.len());
    Ok(WorldStatSeries::new(samples))
}
