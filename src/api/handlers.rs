// HTTP request handlers for the catalog endpoints

use std::sync::Arc;

use actix_web::{web, HttpResponse, Result};
use shopify_client::ShopError;
use tracing::{debug, warn};

use crate::api::models::{
    paginate, AggregationResponse, CatalogQuery, ErrorResponse, HealthResponse, ProductView,
};
use crate::api::server::{AppState, Transport};
use crate::catalog::filter::filter_records;
use crate::catalog::meta::summarize;
use crate::catalog::request::AggregationRequest;
use crate::catalog::walker::{aggregate, Aggregation};

const DEFAULT_PAGE_LIMIT: u32 = 24;
const ERROR_BODY_ECHO_LIMIT: usize = 2048;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        shop: state.shop_domain.clone(),
    }))
}

/// Filtered catalog aggregation. Honors `meta_only` and client-side
/// `page`/`limit` paging.
pub async fn get_products(
    query: web::Query<CatalogQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.to_request();
    let aggregation = match cached_aggregation(&state, &request).await {
        Ok(agg) => agg,
        Err(err) => return Ok(error_response(&err)),
    };

    if query.wants_meta() {
        return Ok(HttpResponse::Ok().json(summarize(&aggregation.records)));
    }

    let products: Vec<ProductView> = aggregation.records.iter().map(ProductView::from).collect();

    if let Some(page) = query.page_param() {
        let limit = query.limit_param().unwrap_or(DEFAULT_PAGE_LIMIT);
        return Ok(HttpResponse::Ok().json(paginate(products, page, limit, aggregation.truncated)));
    }

    Ok(HttpResponse::Ok().json(AggregationResponse {
        count: products.len(),
        truncated: aggregation.truncated,
        products,
    }))
}

/// Vendor/price/color summary over the aggregated catalog.
pub async fn get_products_meta(
    query: web::Query<CatalogQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.to_request();
    match cached_aggregation(&state, &request).await {
        Ok(agg) => Ok(HttpResponse::Ok().json(summarize(&agg.records))),
        Err(err) => Ok(error_response(&err)),
    }
}

/// Cache-through aggregation: serve a fresh entry when one exists, otherwise
/// walk the upstream, filter, and populate the cache. The cached payload is
/// the post-filter record set keyed by the canonical request serialization.
async fn cached_aggregation(
    state: &AppState,
    request: &AggregationRequest,
) -> std::result::Result<Arc<Aggregation>, ShopError> {
    let key = request.cache_key();
    if let Some(hit) = state.cache.get(&key) {
        debug!(key = %key, "catalog cache hit");
        return Ok(hit);
    }
    debug!(key = %key, "catalog cache miss");

    let narrow = request.server_filter();
    let walked = match state.transport {
        Transport::Rest => {
            aggregate(
                &state.rest.with_narrowing(narrow),
                state.bounds,
                &state.throttle,
            )
            .await?
        }
        Transport::Graphql => {
            aggregate(
                &state.graphql.with_narrowing(narrow),
                state.bounds,
                &state.throttle,
            )
            .await?
        }
    };

    let payload = Arc::new(Aggregation {
        records: filter_records(&walked.records, request),
        pages_fetched: walked.pages_fetched,
        truncated: walked.truncated,
    });
    state.cache.put(key, Arc::clone(&payload));
    Ok(payload)
}

/// Map a failed aggregation onto the API error surface: configuration
/// problems are ours (500), everything else is an upstream failure (502)
/// with the upstream status and body echoed for diagnostics.
fn error_response(err: &ShopError) -> HttpResponse {
    warn!(error = %err, "catalog aggregation failed");
    match err {
        ShopError::Config(msg) => HttpResponse::InternalServerError().json(ErrorResponse {
            error: format!("configuration error: {msg}"),
            upstream_status: None,
            details: None,
        }),
        ShopError::Http { status, body } => HttpResponse::BadGateway().json(ErrorResponse {
            error: "upstream request failed".to_string(),
            upstream_status: Some(*status),
            details: Some(truncate_body(body)),
        }),
        other => HttpResponse::BadGateway().json(ErrorResponse {
            error: other.to_string(),
            upstream_status: None,
            details: None,
        }),
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_ECHO_LIMIT {
        return body.to_string();
    }
    body.chars().take(ERROR_BODY_ECHO_LIMIT).collect()
}
