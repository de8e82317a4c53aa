use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical product representation shared by both transports. Filtering and
/// summarization only ever operate on this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Opaque external identifier. REST numeric ids and GraphQL gids are both
    /// kept verbatim as strings.
    pub id: String,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    /// Normalized tag tokens, original casing preserved. Comparisons against
    /// tags are case-folded by the caller.
    pub tags: Vec<String>,
    pub handle: String,
    pub images: Vec<ImageRef>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Parsed unit price. `None` when the source price was absent or did not
    /// parse; such variants never contribute to a price range.
    pub price: Option<f64>,
    pub option1: Option<String>,
    pub option2: Option<String>,
    pub option3: Option<String>,
}

impl CatalogRecord {
    /// `[min, max]` over parsed variant prices. A record with no priced
    /// variants has no range and must fail price-bounded filters rather than
    /// pass as price 0.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut any = false;
        for v in &self.variants {
            if let Some(p) = v.price {
                any = true;
                lo = lo.min(p);
                hi = hi.max(p);
            }
        }
        any.then_some((lo, hi))
    }

    pub(crate) fn from_rest(p: RestProduct) -> Self {
        Self {
            id: id_to_string(&p.id),
            title: p.title,
            vendor: p.vendor,
            product_type: p.product_type,
            tags: split_tags(&p.tags),
            handle: p.handle,
            images: p
                .images
                .into_iter()
                .filter(|i| !i.src.is_empty())
                .map(|i| ImageRef {
                    src: i.src,
                    alt: i.alt.unwrap_or_default(),
                })
                .collect(),
            variants: p
                .variants
                .into_iter()
                .map(|v| Variant {
                    price: v.price.as_deref().and_then(parse_price),
                    option1: non_empty(v.option1),
                    option2: non_empty(v.option2),
                    option3: non_empty(v.option3),
                })
                .collect(),
        }
    }

    /// Best-effort normalization of one GraphQL product node. Returns `None`
    /// when the node has no usable id.
    pub(crate) fn from_graphql_node(node: &Value) -> Option<Self> {
        let id = match node.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };

        let tags = match node.get("tags") {
            // The GraphQL API delivers tags as an array; older payloads used
            // the REST comma-joined form.
            Some(Value::Array(arr)) => arr
                .iter()
                .filter_map(|t| t.as_str())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => split_tags(s),
            _ => Vec::new(),
        };

        let images = edge_nodes(node, "images")
            .filter_map(|img| {
                let src = img.get("src").and_then(|s| s.as_str())?;
                if src.is_empty() {
                    return None;
                }
                Some(ImageRef {
                    src: src.to_string(),
                    alt: img
                        .get("altText")
                        .and_then(|a| a.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();

        let variants = edge_nodes(node, "variants")
            .map(|var| {
                let price = match var.get("price") {
                    Some(Value::String(s)) => parse_price(s),
                    Some(Value::Number(n)) => n.as_f64().filter(|p| p.is_finite()),
                    _ => None,
                };
                let mut options = var
                    .get("selectedOptions")
                    .and_then(|o| o.as_array())
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|o| o.get("value").and_then(|v| v.as_str()))
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
                    .into_iter();
                Variant {
                    price,
                    option1: options.next(),
                    option2: options.next(),
                    option3: options.next(),
                }
            })
            .collect();

        Some(Self {
            id,
            title: str_field(node, "title"),
            vendor: str_field(node, "vendor"),
            product_type: str_field(node, "productType"),
            tags,
            handle: str_field(node, "handle"),
            images,
            variants,
        })
    }
}

/// REST wire shape of `products.json`. Every field defaults so one malformed
/// product does not sink the page.
#[derive(Debug, Deserialize)]
pub(crate) struct RestProductsBody {
    #[serde(default)]
    pub products: Vec<RestProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RestProduct {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product_type: String,
    /// Comma-joined on the wire, e.g. `"sale, color:Red , new"`.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub images: Vec<RestImage>,
    #[serde(default)]
    pub variants: Vec<RestVariant>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RestImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RestVariant {
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub option1: Option<String>,
    #[serde(default)]
    pub option2: Option<String>,
    #[serde(default)]
    pub option3: Option<String>,
}

fn id_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn str_field(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn edge_nodes<'a>(node: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    node.get(key)
        .and_then(|v| v.get("edges"))
        .and_then(|e| e.as_array())
        .into_iter()
        .flatten()
        .filter_map(|edge| edge.get("node"))
}

pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

fn non_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.trim().is_empty())
}
