//! Item filtering and mapping into output records.

pub mod region;

use crate::catalog::{CatalogItem, OutputRecord};

pub use region::RegionFilter;

/// Trait for filtering catalog items.
pub trait Filter: Send + Sync {
    /// Returns true if the item passes the filter.
    fn matches(&self, item: &CatalogItem) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// Turns raw catalog items into output records.
///
/// Pure: no I/O happens here, writing belongs to the caller.
pub struct RecordMapper {
    filter: Box<dyn Filter>,
}

impl RecordMapper {
    /// Creates a mapper gated by the given filter.
    pub fn new(filter: impl Filter + 'static) -> Self {
        Self { filter: Box::new(filter) }
    }

    /// Creates a mapper keeping items available in any of `regions`.
    pub fn for_regions(regions: Vec<String>) -> Self {
        Self::new(RegionFilter::new(regions))
    }

    pub fn description(&self) -> String {
        self.filter.description()
    }

    /// Maps one item, or returns `None` if the filter rejects it.
    ///
    /// A non-null `old_price.price` means the item is discounted: the old
    /// price becomes `price` and the current price becomes `promo_price`.
    pub fn map(&self, item: CatalogItem) -> Option<OutputRecord> {
        if !self.filter.matches(&item) {
            return None;
        }

        let (price, promo_price) = match item.old_price.and_then(|old| old.price) {
            Some(old) => (old, Some(item.price.price)),
            None => (item.price.price, None),
        };

        Some(OutputRecord {
            id: item.id,
            title: item.title,
            price,
            promo_price,
            url: item.link.web_url,
        })
    }

    /// Maps a whole page, dropping rejected items.
    pub fn map_page(&self, items: Vec<CatalogItem>) -> Vec<OutputRecord> {
        items.into_iter().filter_map(|item| self.map(item)).collect()
    }
}
