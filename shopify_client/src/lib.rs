//! Shopify Admin API catalog client.
//!
//! One network call per `fetch_page` invocation; no retries, no caching.
//! Retry/backoff policy and full-catalog accumulation live in the consuming
//! crate (the catalog walker). Both transports normalize their payloads into
//! [`CatalogRecord`] before returning, so callers never see REST snake_case
//! vs GraphQL node shapes.

mod config;
mod error;
mod graphql;
mod pagination;
mod record;
mod rest;

pub use config::ShopConfig;
pub use error::ShopError;
pub use graphql::GraphqlCatalogClient;
pub use pagination::{next_cursor_from_link_header, next_cursor_from_page_meta, PageMeta};
pub use record::{CatalogRecord, ImageRef, Variant};
pub use rest::RestCatalogClient;

use std::time::Duration;

/// Records plus the opaque continuation token for the following page.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub records: Vec<CatalogRecord>,
    /// `None` means the upstream reported no further pages (or its pagination
    /// metadata was absent/malformed, which is treated the same way).
    pub next_cursor: Option<String>,
}

/// Classified result of a single page fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    Page(PageResult),
    /// HTTP 429. Carries the upstream `Retry-After` hint when one was sent.
    Throttled { retry_after: Option<Duration> },
}

/// Server-side narrowing applied to the first request of a walk. The upstream
/// rejects filter params alongside a continuation cursor, so these are only
/// encoded when no cursor is present; client-side filtering re-checks them.
#[derive(Debug, Clone, Default)]
pub struct ServerFilter {
    pub vendor: Option<String>,
    pub product_type: Option<String>,
}

/// One page of catalog records per call. Implemented by both transports and
/// by synthetic sources in tests.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<FetchOutcome, ShopError>;
}
