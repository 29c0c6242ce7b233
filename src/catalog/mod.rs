//! Catalog API access: HTTP client, data models, and page fetching.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod retry;

pub use client::{CatalogApi, CatalogClient};
pub use error::FetchError;
pub use fetcher::{resolve_count, FetchOutcome, PageFetcher};
pub use models::{CatalogItem, OutputRecord, PageTask};
pub use retry::{Backoff, RetryPolicy};
