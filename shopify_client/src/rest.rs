use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::{LINK, RETRY_AFTER};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::pagination::next_cursor_from_link_header;
use crate::record::{CatalogRecord, RestProductsBody};
use crate::{FetchOutcome, PageResult, PageSource, ServerFilter, ShopConfig, ShopError};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// REST transport over `products.json`. Continuation travels in the `Link`
/// response header.
#[derive(Clone)]
pub struct RestCatalogClient {
    http: Client,
    cfg: Arc<ShopConfig>,
    limiter: Option<Arc<DirectLimiter>>,
    narrow: ServerFilter,
}

impl RestCatalogClient {
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
            narrow: ServerFilter::default(),
        })
    }

    /// Clone of this client with first-page narrowing params. The limiter is
    /// shared, so per-request clones still respect the per-shop rate.
    pub fn with_narrowing(&self, narrow: ServerFilter) -> Self {
        Self {
            narrow,
            ..self.clone()
        }
    }

    fn page_url(&self, cursor: Option<&str>) -> Result<String, ShopError> {
        let mut url = Url::parse(&self.cfg.rest_endpoint())
            .map_err(|e| ShopError::Config(format!("bad shop domain: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("limit", &self.cfg.page_size.to_string());
            match cursor {
                // The API rejects filter params alongside page_info, so a
                // continuation request carries the cursor and nothing else.
                Some(c) => {
                    q.append_pair("page_info", c);
                }
                None => {
                    if !self.cfg.fields.is_empty() {
                        q.append_pair("fields", &self.cfg.fields.join(","));
                    }
                    if let Some(v) = &self.narrow.vendor {
                        q.append_pair("vendor", v);
                    }
                    if let Some(pt) = &self.narrow.product_type {
                        q.append_pair("product_type", pt);
                    }
                }
            }
        }
        Ok(url.into())
    }
}

#[async_trait::async_trait]
impl PageSource for RestCatalogClient {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<FetchOutcome, ShopError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let url = self.page_url(cursor)?;
        debug!(url = %url, "rest catalog page request");

        let resp = self
            .http
            .get(&url)
            .header("X-Shopify-Access-Token", &self.cfg.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
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
            debug!(retry_after = ?retry_after, "rest catalog page throttled");
            return Ok(FetchOutcome::Throttled { retry_after });
        }

        let link = resp
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ShopError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RestProductsBody = serde_json::from_str(&body)?;
        let records: Vec<CatalogRecord> = parsed
            .products
            .into_iter()
            .map(CatalogRecord::from_rest)
            .collect();
        let next_cursor = link.as_deref().and_then(next_cursor_from_link_header);
        debug!(
            records = records.len(),
            has_next = next_cursor.is_some(),
            "rest catalog page parsed"
        );

        Ok(FetchOutcome::Page(PageResult {
            records,
            next_cursor,
        }))
    }
}
