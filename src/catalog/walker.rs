//! Cursor-walking aggregation loop.
//!
//! Drives a [`PageSource`] until the continuation cursor is exhausted or a
//! safety bound is reached, retrying throttled fetches per policy. The
//! aggregation is all-or-nothing: any non-throttle failure discards whatever
//! was already accumulated.

use std::time::Duration;

use serde::Serialize;
use shopify_client::{CatalogRecord, FetchOutcome, PageSource, ShopError};
use tracing::{debug, info, warn};

use crate::util::env::{env_flag, env_parse};

/// Caps on total work for one aggregation. Hitting a bound silently
/// truncates the result; it is not an error.
#[derive(Debug, Clone, Copy)]
pub struct WalkBounds {
    pub max_pages: u32,
    pub max_records: usize,
}

impl Default for WalkBounds {
    fn default() -> Self {
        Self {
            max_pages: 8,
            max_records: 2000,
        }
    }
}

impl WalkBounds {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_pages: env_parse("CATALOG_MAX_PAGES", d.max_pages).max(1),
            max_records: env_parse("CATALOG_MAX_RECORDS", d.max_records).max(1),
        }
    }
}

/// Retry policy for 429 responses. The default is bounded exponential
/// backoff; `max_attempts: None` restores the older infinite-patience
/// fixed-delay behavior for operators who prefer it.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    pub base_delay: Duration,
    pub exponential: bool,
    pub max_attempts: Option<u32>,
    pub max_delay: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(600),
            exponential: true,
            max_attempts: Some(5),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ThrottlePolicy {
    pub fn from_env() -> Self {
        let d = Self::default();
        let max_attempts = match env_parse("CATALOG_THROTTLE_MAX_ATTEMPTS", 5u32) {
            0 => None,
            n => Some(n),
        };
        Self {
            base_delay: Duration::from_millis(env_parse("CATALOG_BACKOFF_MS", 600u64).max(1)),
            exponential: env_flag("CATALOG_BACKOFF_EXPONENTIAL", d.exponential),
            max_attempts,
            max_delay: d.max_delay,
        }
    }

    /// Infinite patience: retry 429s forever at a fixed short delay.
    pub fn legacy_fixed() -> Self {
        Self {
            base_delay: Duration::from_millis(600),
            exponential: false,
            max_attempts: None,
            max_delay: Duration::from_secs(30),
        }
    }

    fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let mut delay = if self.exponential {
            self.base_delay
                .saturating_mul(1u32 << attempt.saturating_sub(1).min(10))
        } else {
            self.base_delay
        };
        delay = delay.min(self.max_delay);
        // An explicit upstream hint wins when it asks for more patience.
        if let Some(ra) = retry_after {
            delay = delay.max(ra);
        }
        delay
    }
}

/// Result of one complete walk. `truncated` distinguishes a safety-bound
/// stop from natural cursor exhaustion.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub records: Vec<CatalogRecord>,
    pub pages_fetched: u32,
    pub truncated: bool,
}

/// Accumulate pages from `source` until exhaustion or a bound. Records keep
/// page order and within-page order.
pub async fn aggregate<S: PageSource + ?Sized>(
    source: &S,
    bounds: WalkBounds,
    policy: &ThrottlePolicy,
) -> Result<Aggregation, ShopError> {
    let mut records: Vec<CatalogRecord> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0u32;
    let mut throttle_attempts = 0u32;

    let truncated = loop {
        match source.fetch_page(cursor.as_deref()).await? {
            FetchOutcome::Throttled { retry_after } => {
                throttle_attempts += 1;
                if let Some(max) = policy.max_attempts {
                    if throttle_attempts > max {
                        return Err(ShopError::ThrottleExhausted {
                            attempts: throttle_attempts,
                        });
                    }
                }
                let delay = policy.delay_for(throttle_attempts, retry_after);
                warn!(
                    attempt = throttle_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "catalog fetch throttled; backing off"
                );
                tokio::time::sleep(delay).await;
                // Retry the same page.
            }
            FetchOutcome::Page(page) => {
                throttle_attempts = 0;
                pages_fetched += 1;
                records.extend(page.records);
                debug!(
                    page = pages_fetched,
                    total = records.len(),
                    "catalog page accumulated"
                );
                match page.next_cursor {
                    None => break false,
                    Some(next) => {
                        // Bounds are checked only after a complete page, so a
                        // record cap never slices a page in half.
                        if pages_fetched >= bounds.max_pages || records.len() >= bounds.max_records
                        {
                            break true;
                        }
                        cursor = Some(next);
                    }
                }
            }
        }
    };

    info!(
        pages = pages_fetched,
        records = records.len(),
        truncated,
        "catalog aggregation complete"
    );
    Ok(Aggregation {
        records,
        pages_fetched,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopify_client::{PageResult, Variant};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn rec(id: &str) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            title: id.into(),
            vendor: "Acme".into(),
            product_type: String::new(),
            tags: Vec::new(),
            handle: id.into(),
            images: Vec::new(),
            variants: vec![Variant {
                price: Some(10.0),
                option1: None,
                option2: None,
                option3: None,
            }],
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> FetchOutcome {
        FetchOutcome::Page(PageResult {
            records: ids.iter().map(|id| rec(id)).collect(),
            next_cursor: next.map(str::to_string),
        })
    }

    /// Pops one scripted outcome per fetch call and counts invocations.
    struct ScriptedSource {
        outcomes: Mutex<VecDeque<Result<FetchOutcome, ShopError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<Result<FetchOutcome, ShopError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, _cursor: Option<&str>) -> Result<FetchOutcome, ShopError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(page(&[], None)))
        }
    }

    #[tokio::test]
    async fn walk_collects_all_pages_in_order() {
        let source = ScriptedSource::new(vec![
            Ok(page(&["a", "b"], Some("c1"))),
            Ok(page(&["c"], Some("c2"))),
            Ok(page(&["d", "e"], None)),
        ]);
        let agg = aggregate(&source, WalkBounds::default(), &ThrottlePolicy::default())
            .await
            .unwrap();
        let ids: Vec<&str> = agg.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(agg.pages_fetched, 3);
        assert_eq!(source.calls(), 3);
        assert!(!agg.truncated);
    }

    #[tokio::test]
    async fn record_cap_stops_after_the_complete_page() {
        // Upstream always has more pages of 250 records each.
        let big: Vec<String> = (0..250).map(|i| format!("r{i}")).collect();
        let big_refs: Vec<&str> = big.iter().map(String::as_str).collect();
        let source = ScriptedSource::new(vec![
            Ok(page(&big_refs, Some("c1"))),
            Ok(page(&big_refs, Some("c2"))),
        ]);
        let bounds = WalkBounds {
            max_pages: 100,
            max_records: 50,
        };
        let agg = aggregate(&source, bounds, &ThrottlePolicy::default())
            .await
            .unwrap();
        // No partial-page slicing: the whole first page is kept.
        assert_eq!(agg.records.len(), 250);
        assert_eq!(source.calls(), 1);
        assert!(agg.truncated);
    }

    #[tokio::test]
    async fn page_cap_truncates() {
        let source = ScriptedSource::new(vec![
            Ok(page(&["a"], Some("c1"))),
            Ok(page(&["b"], Some("c2"))),
            Ok(page(&["c"], Some("c3"))),
        ]);
        let bounds = WalkBounds {
            max_pages: 2,
            max_records: 10_000,
        };
        let agg = aggregate(&source, bounds, &ThrottlePolicy::default())
            .await
            .unwrap();
        assert_eq!(agg.pages_fetched, 2);
        assert_eq!(source.calls(), 2);
        assert!(agg.truncated);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_retries_the_same_page_then_succeeds() {
        let source = ScriptedSource::new(vec![
            Ok(FetchOutcome::Throttled { retry_after: None }),
            Ok(FetchOutcome::Throttled {
                retry_after: Some(Duration::from_secs(2)),
            }),
            Ok(page(&["a"], None)),
        ]);
        let agg = aggregate(&source, WalkBounds::default(), &ThrottlePolicy::default())
            .await
            .unwrap();
        assert_eq!(agg.records.len(), 1);
        assert_eq!(agg.pages_fetched, 1);
        assert_eq!(source.calls(), 3);
        assert!(!agg.truncated);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_exhausts_under_sustained_throttling() {
        let source = ScriptedSource::new(vec![
            Ok(FetchOutcome::Throttled { retry_after: None }),
            Ok(FetchOutcome::Throttled { retry_after: None }),
            Ok(FetchOutcome::Throttled { retry_after: None }),
        ]);
        let policy = ThrottlePolicy {
            max_attempts: Some(2),
            ..ThrottlePolicy::default()
        };
        let err = aggregate(&source, WalkBounds::default(), &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ThrottleExhausted { attempts: 3 }));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn upstream_failure_aborts_and_discards_partial_records() {
        let source = ScriptedSource::new(vec![
            Ok(page(&["a"], Some("c1"))),
            Err(ShopError::Http {
                status: 500,
                body: "boom".into(),
            }),
        ]);
        let err = aggregate(&source, WalkBounds::default(), &ThrottlePolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Http { status: 500, .. }));
    }

    #[test]
    fn exponential_delay_doubles_and_honors_retry_after() {
        let policy = ThrottlePolicy::default();
        assert_eq!(
            policy.delay_for(1, None),
            Duration::from_millis(600)
        );
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(1200));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(2400));
        // Upstream asked for more patience than the schedule.
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );

        let fixed = ThrottlePolicy::legacy_fixed();
        assert_eq!(fixed.delay_for(7, None), Duration::from_millis(600));
    }
}
