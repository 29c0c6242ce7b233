//! Data models for catalog items, output records, and page tasks.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::warn;

/// A raw product as returned by the catalog listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    /// Catalog identifier
    pub id: u64,
    /// Product title
    pub title: String,
    /// Current (possibly discounted) price
    pub price: PriceTag,
    /// Price before discount, null when the item is not discounted
    #[serde(default)]
    pub old_price: Option<OldPriceTag>,
    /// Links to the product
    pub link: Link,
    /// Stock availability
    #[serde(default)]
    pub available: Availability,
}

impl CatalogItem {
    /// Returns the region codes where the item can be bought offline.
    pub fn offline_regions(&self) -> &[String] {
        &self.available.offline.region_iso_codes
    }

    /// Pre-discount price, if both the tag and its value are non-null.
    pub fn discounted_from(&self) -> Option<&Number> {
        self.old_price.as_ref().and_then(|old| old.price.as_ref())
    }

    /// Decodes a page item by item, skipping entries that do not match the schema.
    pub fn decode_page(values: Vec<Value>) -> Vec<CatalogItem> {
        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<CatalogItem>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping malformed catalog item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceTag {
    pub price: Number,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OldPriceTag {
    #[serde(default)]
    pub price: Option<Number>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub web_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub offline: OfflineAvailability,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfflineAvailability {
    #[serde(default)]
    pub region_iso_codes: Vec<String>,
}

/// Response of the count query (`meta=*`).
#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub meta: Meta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub length: u64,
}

/// One row of the exported file.
///
/// Field order is the column order of the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub id: u64,
    pub title: String,
    /// Original price when discounted, otherwise the current price
    pub price: Number,
    /// Discounted price, empty when there is no discount
    pub promo_price: Option<Number>,
    pub url: String,
}

/// A single page fetch unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTask {
    pub offset: u64,
    pub limit: u64,
}

impl PageTask {
    /// Plans one task per page covering `0..total`.
    ///
    /// The last task's limit is clamped to the items that remain.
    pub fn plan(total: u64, page_size: u64) -> Vec<PageTask> {
        if page_size == 0 {
            return Vec::new();
        }

        std::iter::successors(Some(0u64), |offset| offset.checked_add(page_size))
            .take_while(|&offset| offset < total)
            .map(|offset| PageTask { offset, limit: page_size.min(total - offset) })
            .collect()
    }

    /// Exclusive end of the offset range this task covers.
    pub fn end(&self) -> u64 {
        self.offset + self.limit
    }
}

impl std::fmt::Display for PageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}
