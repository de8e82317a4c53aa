//! Read-only projection over an aggregated catalog: distinct vendors, price
//! bounds, and the color values encoded in `color:<value>` tags.

use itertools::Itertools;
use serde::Serialize;
use shopify_client::CatalogRecord;

const COLOR_TAG_PREFIX: &str = "color:";

#[derive(Debug, Clone, Serialize)]
pub struct MetaSummary {
    /// 0 when no priced variants exist anywhere in the set.
    pub price_min: f64,
    pub price_max: f64,
    pub vendors: Vec<String>,
    pub colors: Vec<String>,
}

pub fn summarize(records: &[CatalogRecord]) -> MetaSummary {
    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut any_price = false;
    for record in records {
        for variant in &record.variants {
            if let Some(p) = variant.price {
                any_price = true;
                price_min = price_min.min(p);
                price_max = price_max.max(p);
            }
        }
    }
    if !any_price {
        price_min = 0.0;
        price_max = 0.0;
    }

    let vendors: Vec<String> = records
        .iter()
        .map(|r| r.vendor.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unique_by(|v| v.to_lowercase())
        .collect();

    // Colors ride in tags by convention, e.g. "color:Red". First-seen casing
    // of each distinct value is kept for display.
    let colors: Vec<String> = records
        .iter()
        .flat_map(|r| r.tags.iter())
        .filter_map(|tag| {
            let tag = tag.trim();
            let prefix = tag.get(..COLOR_TAG_PREFIX.len())?;
            if !prefix.eq_ignore_ascii_case(COLOR_TAG_PREFIX) {
                return None;
            }
            let value = tag[COLOR_TAG_PREFIX.len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .unique_by(|c| c.to_lowercase())
        .collect();

    MetaSummary {
        price_min,
        price_max,
        vendors,
        colors,
    }
}
