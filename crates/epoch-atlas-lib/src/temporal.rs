//! Temporal attribute resolution over sparse year→value series
//!
//! Source series (city populations, for example) are sampled irregularly and
//! often centuries apart. The resolver picks the best available sample for a query
//! year and labels how much the answer should be trusted.

use crate::Year;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a resolved value was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// The series has a sample at exactly the query year
    Recorded,
    /// Nearest earlier sample is at most `interpolated_max_gap` years away
    Interpolated,
    /// Nearest earlier sample is at most `estimated_max_gap` years away
    Estimated,
    /// Nearest earlier sample is further away than that
    Projected,
    /// Only later samples exist; derived from the earliest one
    Prehistoric,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Interpolated => "interpolated",
            Self::Estimated => "estimated",
            Self::Projected => "projected",
            Self::Prehistoric => "prehistoric",
        }
    }
}

/// First and last attested year of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedRange {
    pub min_year: Year,
    pub max_year: Year,
}

/// Best estimate of a series value at a query year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub value: f64,
    /// Year of the sample the value was taken from
    pub source_year: Year,
    pub confidence: Confidence,
    /// Distance in years between the query year and `source_year`
    pub gap: u32,
}

/// Thresholds of the tiered fallback
///
/// The defaults reproduce the behaviour the population data was tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    pub interpolated_max_gap: u32,
    pub estimated_max_gap: u32,
    /// Gaps beyond this decay the carried value each additional year
    pub decay_after: u32,
    pub decay_rate: f64,
    pub decay_floor: f64,
    /// Share of the earliest sample used before any record exists
    pub prehistoric_factor: f64,
    pub prehistoric_floor: f64,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            interpolated_max_gap: 50,
            estimated_max_gap: 200,
            decay_after: 500,
            decay_rate: 0.999,
            decay_floor: 1000.0,
            prehistoric_factor: 0.5,
            prehistoric_floor: 500.0,
        }
    }
}

impl ResolverPolicy {
    /// Confidence tier for a carried-forward value `gap` years old
    pub fn tier(&self, gap: u32) -> Confidence {
        if gap <= self.interpolated_max_gap {
            Confidence::Interpolated
        } else if gap <= self.estimated_max_gap {
            Confidence::Estimated
        } else {
            Confidence::Projected
        }
    }

    /// Apply long-gap decay to a carried-forward value
    pub fn decay(&self, value: f64, gap: u32) -> f64 {
        if gap <= self.decay_after {
            return value;
        }
        let excess = i32::try_from(gap - self.decay_after).unwrap_or(i32::MAX);
        (value * self.decay_rate.powi(excess)).max(self.decay_floor)
    }
}

/// Resolve a sparse series at an arbitrary year
///
/// Checked in order:
/// 1. Before `range.min_year`: `None` (not yet attested)
/// 2. Exact sample: [`Confidence::Recorded`]
/// 3. Nearest earlier sample: carried forward, tiered by gap, decayed beyond
///    `decay_after` years
/// 4. Only later samples: a share of the earliest one, [`Confidence::Prehistoric`]
/// 5. Otherwise `None`
pub fn resolve_value_for_year<V>(
    series: &BTreeMap<Year, V>,
    year: Year,
    range: AttestedRange,
    policy: &ResolverPolicy,
) -> Option<ResolvedValue>
where
    V: Copy + Into<f64>,
{
    if year < range.min_year {
        return None;
    }

    if let Some(&value) = series.get(&year) {
        return Some(ResolvedValue {
            value: value.into(),
            source_year: year,
            confidence: Confidence::Recorded,
            gap: 0,
        });
    }

    if let Some((&past_year, &value)) = series.range(..year).next_back() {
        let gap = year.abs_diff(past_year);
        return Some(ResolvedValue {
            value: policy.decay(value.into(), gap),
            source_year: past_year,
            confidence: policy.tier(gap),
            gap,
        });
    }

    let (&future_year, &value) = series.range(year..).next()?;
    Some(ResolvedValue {
        value: (value.into() * policy.prehistoric_factor).max(policy.prehistoric_floor),
        source_year: future_year,
        confidence: Confidence::Prehistoric,
        gap: future_year.abs_diff(year),
    })
}
