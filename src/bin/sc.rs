use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shopcat::catalog::filter::filter_records;
use shopcat::catalog::meta::summarize;
use shopcat::catalog::request::AggregationRequest;
use shopcat::catalog::walker::{aggregate, Aggregation, ThrottlePolicy, WalkBounds};
use shopcat::util::env as env_util;
use shopify_client::{GraphqlCatalogClient, PageSource, RestCatalogClient, ShopConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sc", version, about = "Shopcat admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Walk the catalog once, apply filters, and print the result as JSON
    Products {
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        product_type: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        price_min: Option<f64>,
        #[arg(long)]
        price_max: Option<f64>,
        #[arg(long)]
        size: Option<String>,
        /// Override CATALOG_MAX_PAGES for this run
        #[arg(long)]
        max_pages: Option<u32>,
        /// Override CATALOG_MAX_RECORDS for this run
        #[arg(long)]
        max_records: Option<usize>,
        /// Use the GraphQL transport instead of REST
        #[arg(long, default_value_t = false)]
        graphql: bool,
    },
    /// Walk the catalog once and print the vendor/price/color summary
    Meta {
        #[arg(long)]
        max_pages: Option<u32>,
        #[arg(long, default_value_t = false)]
        graphql: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    env_util::init_env();

    let cli = Cli::parse();
    match cli.command {
        Commands::Products {
            vendor,
            product_type,
            title,
            tag,
            price_min,
            price_max,
            size,
            max_pages,
            max_records,
            graphql,
        } => {
            let request = AggregationRequest {
                vendor,
                product_type,
                title,
                tag,
                price_min,
                price_max,
                size,
            }
            .normalized();
            let walked = walk(&request, max_pages, max_records, graphql).await?;
            let result = Aggregation {
                records: filter_records(&walked.records, &request),
                pages_fetched: walked.pages_fetched,
                truncated: walked.truncated,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Meta { max_pages, graphql } => {
            let walked = walk(&AggregationRequest::default(), max_pages, None, graphql).await?;
            println!("{}", serde_json::to_string_pretty(&summarize(&walked.records))?);
        }
    }
    Ok(())
}

async fn walk(
    request: &AggregationRequest,
    max_pages: Option<u32>,
    max_records: Option<usize>,
    graphql: bool,
) -> Result<Aggregation> {
    let cfg = ShopConfig::from_env().context("loading shop configuration")?;
    let mut bounds = WalkBounds::from_env();
    if let Some(p) = max_pages {
        bounds.max_pages = p.max(1);
    }
    if let Some(r) = max_records {
        bounds.max_records = r.max(1);
    }
    let policy = ThrottlePolicy::from_env();
    let narrow = request.server_filter();

    let source: Box<dyn PageSource> = if graphql {
        Box::new(GraphqlCatalogClient::new(cfg)?.with_narrowing(narrow))
    } else {
        Box::new(RestCatalogClient::new(cfg)?.with_narrowing(narrow))
    };
    let agg = aggregate(source.as_ref(), bounds, &policy)
        .await
        .context("catalog aggregation failed")?;
    Ok(agg)
}
