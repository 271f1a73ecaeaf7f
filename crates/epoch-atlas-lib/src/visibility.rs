//! Entity visibility by validity interval

use crate::Year;

/// A named record valid over an inclusive year interval
pub trait Temporal {
    fn name(&self) -> &str;
    fn valid_from(&self) -> Year;
    fn valid_to(&self) -> Year;

    /// Whether `year` falls inside `[valid_from, valid_to]`
    #[inline]
    fn is_valid_at(&self, year: Year) -> bool {
        self.valid_from() <= year && year <= self.valid_to()
    }
}

/// Composite/aggregate wrapper records are named in parentheses, e.g. `"(Roman Empire)"`
#[inline]
pub fn is_composite_name(name: &str) -> bool {
    let name = name.trim();
    name.len() >= 2 && name.starts_with('(') && name.ends_with(')')
}

/// Entities valid at `year`, composite wrappers excluded, in source order
pub fn visible_at<T: Temporal>(year: Year, entities: &[T]) -> Vec<&T> {
    #[cfg(feature = "profiling")]
    profiling::scope!("visibility::visible_at");

    entities
        .iter()
        .filter(|e| e.is_valid_at(year) && !is_composite_name(e.name()))
        .collect()
}
