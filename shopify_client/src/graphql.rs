use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::pagination::{next_cursor_from_page_meta, PageMeta};
use crate::record::CatalogRecord;
use crate::{FetchOutcome, PageResult, PageSource, ServerFilter, ShopConfig, ShopError};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const PRODUCTS_QUERY: &str = r#"
query CatalogPage($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query) {
    pageInfo { hasNextPage }
    edges {
      cursor
      node {
        id
        title
        vendor
        productType
        tags
        handle
        images(first: 10) { edges { node { src altText } } }
        variants(first: 100) { edges { node { price selectedOptions { name value } } } }
      }
    }
  }
}
"#;

/// GraphQL transport over `graphql.json`. Continuation travels as
/// `pageInfo.hasNextPage` plus the last edge's cursor.
#[derive(Clone)]
pub struct GraphqlCatalogClient {
    http: Client,
    cfg: Arc<ShopConfig>,
    limiter: Option<Arc<DirectLimiter>>,
    query_filter: Option<String>,
}

impl GraphqlCatalogClient {
    pub fn new(cfg: ShopConfig) -> Result<Self, ShopError> {
        cfg.validate()?;
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let limiter = NonZeroU32::new(cfg.rps)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));
        Ok(Self {
            http,
            cfg: Arc::new(cfg),
            limiter,
            query_filter: None,
        })
    }

    /// Clone with a server-side `query:` filter string derived from the
    /// narrowing params (`vendor:Acme AND product_type:Shirt`). Client-side
    /// filtering re-checks both clauses.
    pub fn with_narrowing(&self, narrow: ServerFilter) -> Self {
        let mut terms = Vec::new();
        if let Some(v) = &narrow.vendor {
            terms.push(format!("vendor:{v}"));
        }
        if let Some(pt) = &narrow.product_type {
            terms.push(format!("product_type:{pt}"));
        }
        Self {
            query_filter: (!terms.is_empty()).then(|| terms.join(" AND ")),
            ..self.clone()
        }
    }

    fn page_from_payload(payload: &Value) -> Result<PageResult, ShopError> {
        if let Some(errors) = payload.get("errors").filter(|e| !e.is_null()) {
            return Err(ShopError::Other(format!("graphql errors: {errors}")));
        }
        let products = payload
            .get("data")
            .and_then(|d| d.get("products"))
            .ok_or_else(|| ShopError::Other("graphql payload missing data.products".into()))?;

        let edges = products
            .get("edges")
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        let records: Vec<CatalogRecord> = edges
            .iter()
            .filter_map(|edge| edge.get("node"))
            .filter_map(CatalogRecord::from_graphql_node)
            .collect();

        // Absent/malformed pageInfo means final page, never a failure.
        let meta = PageMeta {
            has_next_page: products
                .get("pageInfo")
                .and_then(|p| p.get("hasNextPage"))
                .and_then(|b| b.as_bool())
                .unwrap_or(false),
            last_cursor: edges
                .last()
                .and_then(|edge| edge.get("cursor"))
                .and_then(|c| c.as_str())
                .map(str::to_string),
        };

        Ok(PageResult {
            next_cursor: next_cursor_from_page_meta(&meta),
            records,
        })
    }
}

#[async_trait::async_trait]
impl PageSource for GraphqlCatalogClient {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<FetchOutcome, ShopError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let body = json!({
            "query": PRODUCTS_QUERY,
            "variables": {
                "first": self.cfg.page_size,
                "after": cursor,
                "query": self.query_filter,
            }
        });
        debug!(after = ?cursor, query = ?self.query_filter, "graphql catalog page request");

        let resp = self
            .http
            .post(self.cfg.graphql_endpoint())
            .header("X-Shopify-Access-Token", &self.cfg.access_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            debug!(retry_after = ?retry_after, "graphql catalog page throttled");
            return Ok(FetchOutcome::Throttled { retry_after });
        }

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ShopError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = serde_json::from_str(&text)?;
        let page = Self::page_from_payload(&payload)?;
        debug!(
            records = page.records.len(),
            has_next = page.next_cursor.is_some(),
            "graphql catalog page parsed"
        );
        Ok(FetchOutcome::Page(page))
    }
}
