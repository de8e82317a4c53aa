//! Pure predicate evaluation over an aggregated record set.
//!
//! The request is a conjunction of independently-optional clauses; a clause
//! that is absent never rejects a record. Vendor, product type and title use
//! permissive case-insensitive substring matching; tags are discrete labels
//! and match by exact case-folded token.

use shopify_client::CatalogRecord;

use crate::catalog::request::AggregationRequest;

pub fn filter_records(records: &[CatalogRecord], req: &AggregationRequest) -> Vec<CatalogRecord> {
    records
        .iter()
        .filter(|r| matches(r, req))
        .cloned()
        .collect()
}

fn matches(record: &CatalogRecord, req: &AggregationRequest) -> bool {
    if let Some(v) = &req.vendor {
        if !contains_ci(&record.vendor, v) {
            return false;
        }
    }
    if let Some(pt) = &req.product_type {
        if !contains_ci(&record.product_type, pt) {
            return false;
        }
    }
    if let Some(t) = &req.title {
        if !contains_ci(&record.title, t) {
            return false;
        }
    }
    if let Some(tag) = &req.tag {
        let needle = tag.to_lowercase();
        if !record.tags.iter().any(|t| t.to_lowercase() == needle) {
            return false;
        }
    }
    if req.price_min.is_some() || req.price_max.is_some() {
        // A record without priced variants has an undefined price range and
        // fails any price-bounded query rather than passing as price 0.
        let Some((lo, hi)) = record.price_range() else {
            return false;
        };
        if let Some(min) = req.price_min {
            if hi < min {
                return false;
            }
        }
        if let Some(max) = req.price_max {
            if lo > max {
                return false;
            }
        }
    }
    if let Some(size) = &req.size {
        let wanted = size.to_lowercase();
        let hit = record.variants.iter().any(|v| {
            [&v.option1, &v.option2, &v.option3]
                .into_iter()
                .flatten()
                .any(|o| o.to_lowercase() == wanted)
        });
        if !hit {
            return false;
        }
    }
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopify_client::Variant;

    fn record(id: &str, vendor: &str, tags: &[&str], prices: &[f64]) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            title: format!("Product {id}"),
            vendor: vendor.into(),
            product_type: "Widget".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            handle: format!("product-{id}"),
            images: Vec::new(),
            variants: prices
                .iter()
                .map(|p| Variant {
                    price: Some(*p),
                    option1: Some("M".into()),
                    option2: None,
                    option3: None,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_predicate_is_identity() {
        let records = vec![
            record("1", "Acme", &["sale"], &[10.0]),
            record("2", "", &[], &[]),
        ];
        let out = filter_records(&records, &AggregationRequest::default());
        assert_eq!(out.len(), records.len());
        assert_eq!(out[0].id, "1");
        assert_eq!(out[1].id, "2");
    }

    #[test]
    fn tag_clause_matches_exact_token_case_insensitively() {
        let records = vec![
            record("1", "Acme", &["Red", "sale"], &[10.0]),
            record("2", "Acme", &["bright-red"], &[10.0]),
        ];
        let req = AggregationRequest {
            tag: Some("red".into()),
            ..Default::default()
        };
        let out = filter_records(&records, &req);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "1");
    }

    #[test]
    fn priceless_records_fail_any_price_bounded_clause() {
        let records = vec![record("1", "Acme", &[], &[])];
        let req = AggregationRequest {
            price_max: Some(1000.0),
            ..Default::default()
        };
        assert!(filter_records(&records, &req).is_empty());
    }

    #[test]
    fn price_range_overlap_with_open_bounds() {
        // Variants at 8 and 12: range [8, 12].
        let spread = vec![record("1", "Acme", &[], &[8.0, 12.0])];

        let min_only = AggregationRequest {
            price_min: Some(10.0),
            ..Default::default()
        };
        assert_eq!(filter_records(&spread, &min_only).len(), 1);

        let above = AggregationRequest {
            price_min: Some(12.5),
            ..Default::default()
        };
        assert!(filter_records(&spread, &above).is_empty());

        let below = AggregationRequest {
            price_max: Some(7.0),
            ..Default::default()
        };
        assert!(filter_records(&spread, &below).is_empty());
    }

    #[test]
    fn vendor_and_price_scenario() {
        let records = vec![
            record("a", "Acme", &[], &[15.0]),
            record("b", "Acme", &[], &[25.0]),
        ];
        let req = AggregationRequest {
            vendor: Some("Acme".into()),
            price_min: Some(10.0),
            price_max: Some(20.0),
            ..Default::default()
        };
        let out = filter_records(&records, &req);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn vendor_matches_substring_case_insensitively() {
        let records = vec![record("1", "Acme Industries", &[], &[10.0])];
        let req = AggregationRequest {
            vendor: Some("acme".into()),
            ..Default::default()
        };
        assert_eq!(filter_records(&records, &req).len(), 1);
    }

    #[test]
    fn size_matches_any_variant_option() {
        let mut rec = record("1", "Acme", &[], &[10.0]);
        rec.variants[0].option2 = Some("Blue".into());
        let records = vec![rec];

        let by_size = AggregationRequest {
            size: Some("m".into()),
            ..Default::default()
        };
        assert_eq!(filter_records(&records, &by_size).len(), 1);

        let by_color_option = AggregationRequest {
            size: Some("blue".into()),
            ..Default::default()
        };
        assert_eq!(filter_records(&records, &by_color_option).len(), 1);

        let missing = AggregationRequest {
            size: Some("XL".into()),
            ..Default::default()
        };
        assert!(filter_records(&records, &missing).is_empty());
    }
}
