// API server implementation using actix-web

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use shopify_client::{GraphqlCatalogClient, RestCatalogClient, ShopConfig};
use std::env;

use crate::api::{middleware, routes};
use crate::catalog::cache::ResultCache;
use crate::catalog::walker::{ThrottlePolicy, WalkBounds};
use crate::util::env::env_opt;

/// Which Admin API transport the walker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Rest,
    Graphql,
}

impl Transport {
    pub fn from_env() -> Self {
        match env_opt("SHOPIFY_TRANSPORT").as_deref() {
            Some("graphql") => Transport::Graphql,
            _ => Transport::Rest,
        }
    }
}

/// Process-wide state shared by all handlers. The cache is created once here
/// and lives for the life of the process.
pub struct AppState {
    pub rest: RestCatalogClient,
    pub graphql: GraphqlCatalogClient,
    pub cache: ResultCache,
    pub bounds: WalkBounds,
    pub throttle: ThrottlePolicy,
    pub transport: Transport,
    pub shop_domain: String,
}

impl AppState {
    pub fn from_env() -> Result<Self> {
        let cfg = ShopConfig::from_env()?;
        let shop_domain = cfg.shop_domain.clone();
        Ok(Self {
            rest: RestCatalogClient::new(cfg.clone())?,
            graphql: GraphqlCatalogClient::new(cfg)?,
            cache: ResultCache::from_env(),
            bounds: WalkBounds::from_env(),
            throttle: ThrottlePolicy::from_env(),
            transport: Transport::from_env(),
            shop_domain,
        })
    }
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;
        let allowed_origins =
            env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            shop = %state.shop_domain,
            transport = ?state.transport,
            "Starting shopcat API server"
        );

        let data = web::Data::new(state);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(data.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
