// API request/response models (DTOs)

use serde::{Deserialize, Serialize};
use shopify_client::CatalogRecord;

use crate::catalog::request::AggregationRequest;

/// Raw query params accepted by the catalog endpoints. Price bounds and
/// paging arrive as strings: an unparseable number degrades to "clause
/// absent" instead of rejecting the whole request with a 400.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub vendor: Option<String>,
    #[serde(default, alias = "productType")]
    pub product_type: Option<String>,
    pub title: Option<String>,
    pub tag: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    #[serde(default, rename = "filter.v.option.size", alias = "size")]
    pub size: Option<String>,
    pub meta_only: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl CatalogQuery {
    pub fn to_request(&self) -> AggregationRequest {
        AggregationRequest {
            vendor: self.vendor.clone(),
            product_type: self.product_type.clone(),
            title: self.title.clone(),
            tag: self.tag.clone(),
            price_min: AggregationRequest::parse_price(self.price_min.as_deref()),
            price_max: AggregationRequest::parse_price(self.price_max.as_deref()),
            size: self.size.clone(),
        }
        .normalized()
    }

    pub fn wants_meta(&self) -> bool {
        matches!(
            self.meta_only.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes")
        )
    }

    pub fn page_param(&self) -> Option<u32> {
        self.page
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
    }

    pub fn limit_param(&self) -> Option<u32> {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|l| *l > 0)
    }
}

/// Catalog record projection returned to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
}

impl From<&CatalogRecord> for ProductView {
    fn from(r: &CatalogRecord) -> Self {
        let range = r.price_range();
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            vendor: r.vendor.clone(),
            product_type: r.product_type.clone(),
            tags: r.tags.clone(),
            handle: r.handle.clone(),
            image: r.images.first().map(|i| i.src.clone()),
            price: range.map(|(lo, _)| lo),
            price_max: range.map(|(_, hi)| hi),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AggregationResponse {
    pub count: usize,
    pub truncated: bool,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Serialize)]
pub struct PagedResponse {
    pub products: Vec<ProductView>,
    pub truncated: bool,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub shop: String,
}

/// Client-side page slice over an already-materialized product list.
pub fn paginate(
    products: Vec<ProductView>,
    page: u32,
    limit: u32,
    truncated: bool,
) -> PagedResponse {
    let limit = limit.max(1);
    let total = products.len() as u32;
    let total_pages = total.div_ceil(limit);
    let current_page = page.max(1);
    let start = (current_page as usize - 1).saturating_mul(limit as usize);
    let slice: Vec<ProductView> = products
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();
    PagedResponse {
        products: slice,
        truncated,
        pagination: Pagination {
            current_page,
            total_pages,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1 && total_pages > 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn views(n: usize) -> Vec<ProductView> {
        (0..n)
            .map(|i| ProductView {
                id: i.to_string(),
                title: format!("p{i}"),
                vendor: String::new(),
                product_type: String::new(),
                tags: Vec::new(),
                handle: String::new(),
                image: None,
                price: None,
                price_max: None,
            })
            .collect()
    }

    #[test]
    fn paginate_slices_and_reports_neighbors() {
        let out = paginate(views(25), 2, 10, false);
        assert_eq!(out.products.len(), 10);
        assert_eq!(out.products[0].id, "10");
        assert_eq!(out.pagination.total_pages, 3);
        assert!(out.pagination.has_next_page);
        assert!(out.pagination.has_prev_page);
    }

    #[test]
    fn paginate_past_the_end_is_empty_not_an_error() {
        let out = paginate(views(5), 9, 10, false);
        assert!(out.products.is_empty());
        assert_eq!(out.pagination.total_pages, 1);
        assert!(!out.pagination.has_next_page);
        assert!(out.pagination.has_prev_page);
    }

    #[test]
    fn bad_numeric_params_degrade_to_absent() {
        let q = CatalogQuery {
            price_min: Some("cheap".into()),
            price_max: Some("20".into()),
            page: Some("first".into()),
            ..Default::default()
        };
        let req = q.to_request();
        assert_eq!(req.price_min, None);
        assert_eq!(req.price_max, Some(20.0));
        assert_eq!(q.page_param(), None);
    }

    #[test]
    fn product_view_projects_first_image_and_price_range() {
        use shopify_client::{ImageRef, Variant};
        let rec = CatalogRecord {
            id: "1".into(),
            title: "Thing".into(),
            vendor: "Acme".into(),
            product_type: "Widget".into(),
            tags: vec!["sale".into()],
            handle: "thing".into(),
            images: vec![
                ImageRef {
                    src: "https://cdn.example/a.png".into(),
                    alt: String::new(),
                },
                ImageRef {
                    src: "https://cdn.example/b.png".into(),
                    alt: String::new(),
                },
            ],
            variants: vec![
                Variant {
                    price: Some(15.0),
                    option1: None,
                    option2: None,
                    option3: None,
                },
                Variant {
                    price: Some(9.5),
                    option1: None,
                    option2: None,
                    option3: None,
                },
            ],
        };
        let view = ProductView::from(&rec);
        assert_eq!(view.image.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(view.price, Some(9.5));
        assert_eq!(view.price_max, Some(15.0));
    }
}
