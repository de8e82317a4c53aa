use crate::ShopError;

const DEFAULT_API_VERSION: &str = "2024-01";
const DEFAULT_PAGE_SIZE: u32 = 250;
const DEFAULT_FIELDS: &str = "id,title,vendor,product_type,tags,handle,images,variants";

/// Connection settings for one shop. Built from `SHOPIFY_*` env vars in the
/// binaries; constructed directly in tests.
#[derive(Clone, Debug)]
pub struct ShopConfig {
    /// Shop domain, e.g. `my-store.myshopify.com`.
    pub shop_domain: String,
    /// Admin API access token, sent as `X-Shopify-Access-Token`.
    pub access_token: String,
    pub api_version: String,
    /// Records per page. The Admin API caps this at 250.
    pub page_size: u32,
    /// REST field selection, joined into the `fields` query param.
    pub fields: Vec<String>,
    pub timeout_secs: u64,
    /// Requests per second against the shop; 0 disables the limiter.
    pub rps: u32,
    pub user_agent: String,
}

impl ShopConfig {
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            fields: DEFAULT_FIELDS.split(',').map(str::to_string).collect(),
            timeout_secs: 30,
            rps: 2,
            user_agent: format!("shopcat/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Read settings from the environment. Accepts both naming schemes the
    /// deployed handlers used (`SHOPIFY_STORE`/`SHOPIFY_ADMIN_API_ACCESS` and
    /// `SHOPIFY_SHOP`/`SHOPIFY_ACCESS_TOKEN`). Missing domain or token is a
    /// hard error before any network traffic.
    pub fn from_env() -> Result<Self, ShopError> {
        dotenv::dotenv().ok();

        let shop_domain = env_first(&["SHOPIFY_STORE", "SHOPIFY_SHOP"]).ok_or_else(|| {
            ShopError::Config("missing env: SHOPIFY_STORE (or SHOPIFY_SHOP)".into())
        })?;
        let access_token = env_first(&["SHOPIFY_ADMIN_API_ACCESS", "SHOPIFY_ACCESS_TOKEN"])
            .ok_or_else(|| {
                ShopError::Config(
                    "missing env: SHOPIFY_ADMIN_API_ACCESS (or SHOPIFY_ACCESS_TOKEN)".into(),
                )
            })?;

        let mut cfg = Self::new(shop_domain, access_token);
        if let Some(v) = env_first(&["SHOPIFY_API_VERSION"]) {
            cfg.api_version = v;
        }
        if let Some(n) = env_parse::<u32>("SHOPIFY_PAGE_SIZE") {
            cfg.page_size = n.clamp(1, 250);
        }
        if let Some(raw) = env_first(&["SHOPIFY_FIELDS"]) {
            cfg.fields = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(n) = env_parse::<u64>("SHOPIFY_TIMEOUT_SECS") {
            cfg.timeout_secs = n.max(1);
        }
        if let Some(n) = env_parse::<u32>("SHOPIFY_RPS") {
            cfg.rps = n;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ShopError> {
        if self.shop_domain.trim().is_empty() {
            return Err(ShopError::Config("shop domain is empty".into()));
        }
        if self.access_token.trim().is_empty() {
            return Err(ShopError::Config("access token is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn rest_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/products.json",
            self.shop_domain, self.api_version
        )
    }

    pub(crate) fn graphql_endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop_domain, self.api_version
        )
    }
}

fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        std::env::var(k)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_blank_credentials() {
        assert!(ShopConfig::new("", "token").validate().is_err());
        assert!(ShopConfig::new("shop.example.com", "  ").validate().is_err());
        assert!(ShopConfig::new("shop.example.com", "token").validate().is_ok());
    }

    #[test]
    fn endpoints_embed_domain_and_version() {
        let cfg = ShopConfig::new("acme.myshopify.com", "t");
        assert_eq!(
            cfg.rest_endpoint(),
            "https://acme.myshopify.com/admin/api/2024-01/products.json"
        );
        assert_eq!(
            cfg.graphql_endpoint(),
            "https://acme.myshopify.com/admin/api/2024-01/graphql.json"
        );
    }
}
