//! Deterministic entity colours
//!
//! Each entity name hashes to a colour seed with one of a closed set of hash
//! functions; a palette turns the seed into a colour. The same name always gets the
//! same colour, whichever fragment of the entity is on screen.

use crate::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Name hash used for colour seeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorHash {
    #[default]
    Crc32,
    Fnv1a,
    Djb2,
}

impl ColorHash {
    pub fn hash(&self, name: &str) -> u32 {
        match self {
            Self::Crc32 => crc32fast::hash(name.as_bytes()),
            Self::Fnv1a => fnv1a(name.as_bytes()),
            Self::Djb2 => djb2(name.as_bytes()),
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Crc32, Self::Fnv1a, Self::Djb2]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Fnv1a => "fnv1a",
            Self::Djb2 => "djb2",
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, &b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

fn djb2(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(5381u32, |hash, &b| hash.wrapping_mul(33).wrapping_add(b as u32))
}

impl FromStr for ColorHash {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|h| h.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AtlasError::UnknownVariant {
                kind: "color hash",
                name: s.to_string(),
            })
    }
}

/// Fixed colour lists for entity fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    #[default]
    Vivid,
    Pastel,
    Earth,
}

const VIVID: &[&str] = &[
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#008080", "#9a6324", "#800000",
];

const PASTEL: &[&str] = &[
    "#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4", "#fed9a6", "#ffffcc", "#e5d8bd", "#fddaec",
];

const EARTH: &[&str] = &[
    "#8c510a", "#bf812d", "#dfc27d", "#80cdc1", "#35978f", "#01665e", "#a6611a", "#5e3c99",
    "#b2abd2", "#7f3b08",
];

impl Palette {
    pub fn colors(&self) -> &'static [&'static str] {
        match self {
            Self::Vivid => VIVID,
            Self::Pastel => PASTEL,
            Self::Earth => EARTH,
        }
    }

    /// Colour for a seed produced by [`ColorHash::hash`]
    #[inline]
    pub fn color_for(&self, seed: u32) -> &'static str {
        let colors = self.colors();
        colors[seed as usize % colors.len()]
    }

    pub fn all() -> &'static [Self] {
        &[Self::Vivid, Self::Pastel, Self::Earth]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vivid => "vivid",
            Self::Pastel => "pastel",
            Self::Earth => "earth",
        }
    }
}

impl FromStr for Palette {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AtlasError::UnknownVariant {
                kind: "palette",
                name: s.to_string(),
            })
    }
}
