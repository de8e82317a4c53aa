use shopify_client::ServerFilter;

/// Normalized filter/aggregation parameters. All clauses are optional; an
/// absent clause is vacuously true in the evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationRequest {
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub title: Option<String>,
    pub tag: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub size: Option<String>,
}

impl AggregationRequest {
    /// Trim clause values and drop empty ones, so `vendor=` and a missing
    /// `vendor` normalize to the same request.
    pub fn normalized(mut self) -> Self {
        for clause in [
            &mut self.vendor,
            &mut self.product_type,
            &mut self.title,
            &mut self.tag,
            &mut self.size,
        ] {
            *clause = clause
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        self
    }

    /// Parse one raw price bound. Failures mean "clause absent", never an
    /// error.
    pub fn parse_price(raw: Option<&str>) -> Option<f64> {
        raw.and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite())
    }

    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }

    /// Canonical cache key. Field order is fixed and values are case-folded,
    /// so two requests that differ only in supply order or clause casing
    /// share an entry.
    pub fn cache_key(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut push = |name: &str, value: &Option<String>| {
            if let Some(v) = value {
                parts.push(format!("{name}={}", v.to_lowercase()));
            }
        };
        push("vendor", &self.vendor);
        push("product_type", &self.product_type);
        push("title", &self.title);
        push("tag", &self.tag);
        push("size", &self.size);
        if let Some(p) = self.price_min {
            parts.push(format!("price_min={p}"));
        }
        if let Some(p) = self.price_max {
            parts.push(format!("price_max={p}"));
        }
        parts.join("&")
    }

    /// The subset the upstream can narrow server-side on the first page.
    pub fn server_filter(&self) -> ServerFilter {
        ServerFilter {
            vendor: self.vendor.clone(),
            product_type: self.product_type.clone(),
        }
    }
}
