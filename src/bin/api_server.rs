// HTTP API server binary for shopcat
// Serves filtered catalog aggregations over the Shopify Admin API

use anyhow::Result;
use shopcat::api::{ApiServer, AppState};
use shopcat::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=warn".into()),
        )
        .init();

    tracing::info!("Initializing shopcat API server");

    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();
    env_util::preflight_check(
        "api_server",
        &[],
        &[
            "SHOPIFY_STORE",
            "SHOPIFY_SHOP",
            "SHOPIFY_API_VERSION",
            "SHOPIFY_TRANSPORT",
            "SHOPIFY_ADMIN_API_ACCESS",
            "ALLOWED_ORIGINS",
            "CATALOG_CACHE_TTL_SECS",
            "CATALOG_MAX_PAGES",
            "CATALOG_MAX_RECORDS",
        ],
    )?;

    // Load configuration from environment; fails fast when the shop domain
    // or access token is missing.
    let server = ApiServer::from_env()?;
    let state = AppState::from_env()?;

    // Start HTTP server
    server.run(state).await?;

    Ok(())
}
