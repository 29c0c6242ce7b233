//! catalog-crawler - Concurrent catalog crawler with CSV export
//!
//! Resolves the size of a paginated product listing, fetches every page in
//! parallel with bounded retry, keeps items stocked in the target regions and
//! streams them into a single CSV file.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod filters;
pub mod output;

pub use catalog::{CatalogItem, OutputRecord, PageTask};
pub use commands::{HarvestCommand, HarvestReport};
pub use config::Config;
