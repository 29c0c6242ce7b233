//! Regional availability filter.

use super::Filter;
use crate::catalog::CatalogItem;

/// Keeps items available offline in at least one of the target regions.
pub struct RegionFilter {
    regions: Vec<String>,
}

impl RegionFilter {
    /// Creates a filter for the given region codes (e.g. `RU-MOW`).
    pub fn new(regions: Vec<String>) -> Self {
        Self { regions }
    }
}

impl Filter for RegionFilter {
    fn matches(&self, item: &CatalogItem) -> bool {
        item.offline_regions().iter().any(|code| self.regions.contains(code))
    }

    fn description(&self) -> String {
        format!("Available offline in: {}", self.regions.join(", "))
    }
}
