//! City settlement points with sparse population series

use crate::temporal::{AttestedRange, ResolvedValue, ResolverPolicy, resolve_value_for_year};
use crate::{AtlasError, Result, Year};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// A settlement with its recorded populations
#[derive(Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub other_name: Option<String>,
    pub country: Option<String>,
    /// Source certainty grade (1 = most certain)
    pub certainty: u8,
    pub lon: f64,
    pub lat: f64,
    populations: BTreeMap<Year, u32>,
    min_year: Year,
    max_year: Year,
}

/// A city resolved at a query year, ready to hand to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityAtYear {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_name: Option<String>,
    pub lon: f64,
    pub lat: f64,
    pub population: u64,
    #[serde(flatten)]
    pub estimate: ResolvedValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl City {
    /// Create a city, widening the attested bounds so that
    /// `min_year <= max(populations) <= max_year` holds
    ///
    /// # Arguments
    /// * `populations` - Recorded samples; non-positive counts are dropped
    /// * `min_year`, `max_year` - Stored bounds, derived from the samples when absent
    ///
    /// # Returns
    /// The city, or an error when there are no positive samples and no stored bounds
    pub fn new(
        name: impl Into<String>,
        lon: f64,
        lat: f64,
        populations: BTreeMap<Year, u32>,
        min_year: Option<Year>,
        max_year: Option<Year>,
    ) -> Result<Self> {
        let populations: BTreeMap<Year, u32> =
            populations.into_iter().filter(|(_, pop)| *pop > 0).collect();

        let first = populations.keys().next().copied();
        let last = populations.keys().next_back().copied();

        let min_year = match (min_year, first) {
            (Some(stored), Some(first)) => stored.min(first),
            (Some(stored), None) => stored,
            (None, Some(first)) => first,
            (None, None) => {
                return Err(AtlasError::MissingData(format!(
                    "city {}: neither populations nor attested years",
                    name.into()
                )));
            }
        };
        let max_year = match (max_year, last) {
            (Some(stored), Some(last)) => stored.max(last),
            (Some(stored), None) => stored,
            (None, Some(last)) => last,
            (None, None) => min_year,
        }
        .max(min_year);

        Ok(Self {
            name: name.into(),
            other_name: None,
            country: None,
            certainty: 1,
            lon,
            lat,
            populations,
            min_year,
            max_year,
        })
    }

    #[inline]
    pub fn populations(&self) -> &BTreeMap<Year, u32> {
        &self.populations
    }

    #[inline]
    pub fn min_year(&self) -> Year {
        self.min_year
    }

    #[inline]
    pub fn max_year(&self) -> Year {
        self.max_year
    }

    #[inline]
    pub fn attested_range(&self) -> AttestedRange {
        AttestedRange {
            min_year: self.min_year,
            max_year: self.max_year,
        }
    }

    /// Largest recorded population
    pub fn max_population(&self) -> u32 {
        self.populations.values().copied().max().unwrap_or(0)
    }

    /// Population estimate at `year`, `None` before the city is attested
    #[inline]
    pub fn population_at(&self, year: Year, policy: &ResolverPolicy) -> Option<ResolvedValue> {
        resolve_value_for_year(&self.populations, year, self.attested_range(), policy)
    }

    /// Identity key used when merging sources: name and exact coordinates
    fn merge_key(&self) -> (String, u64, u64) {
        (self.name.clone(), self.lat.to_bits(), self.lon.to_bits())
    }
}

/// Parse a wide-table population column header
///
/// `"BC_3700"` is -3700, `"AD_100"` is 100; anything else is `None`.
pub fn parse_year_column(column: &str) -> Option<Year> {
    let (era, digits) = column.trim().split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: Year = digits.parse().ok()?;
    match era {
        "BC" => Some(-year),
        "AD" => Some(year),
        _ => None,
    }
}

/// Merge two city sources keyed by name and coordinates
///
/// Samples from `secondary` fill years missing in `primary` and replace primary
/// samples earlier than `prefer_secondary_before`. Cities present in only one source
/// are kept; output keeps primary order followed by cities new in `secondary`.
pub fn merge_city_sources(
    primary: Vec<City>,
    secondary: Vec<City>,
    prefer_secondary_before: Year,
) -> Vec<City> {
    let mut merged = primary;
    let mut positions: HashMap<(String, u64, u64), usize> = merged
        .iter()
        .enumerate()
        .map(|(i, city)| (city.merge_key(), i))
        .collect();

    for city in secondary {
        let key = city.merge_key();
        match positions.get(&key) {
            Some(&index) => {
                let target = &mut merged[index];
                for (&year, &pop) in &city.populations {
                    if year < prefer_secondary_before || !target.populations.contains_key(&year) {
                        target.populations.insert(year, pop);
                    }
                }
                target.min_year = target.min_year.min(city.min_year);
                target.max_year = target.max_year.max(city.max_year);
                if target.other_name.is_none() {
                    target.other_name = city.other_name;
                }
                if target.country.is_none() {
                    target.country = city.country;
                }
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(city);
            }
        }
    }

    tracing::debug!("Merged city sources into {} cities", merged.len());
    merged
}

/// Display density: minimum resolved population for a city to be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityDensity {
    Sparse,
    #[default]
    Normal,
    Dense,
    All,
}

impl CityDensity {
    pub fn min_population(&self) -> u64 {
        match self {
            Self::Sparse => 100_000,
            Self::Normal => 40_000,
            Self::Dense => 10_000,
            Self::All => 0,
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Sparse, Self::Normal, Self::Dense, Self::All]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sparse => "sparse",
            Self::Normal => "normal",
            Self::Dense => "dense",
            Self::All => "all",
        }
    }
}

impl FromStr for CityDensity {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AtlasError::UnknownVariant {
                kind: "city density",
                name: s.to_string(),
            })
    }
}
