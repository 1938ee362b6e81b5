//! # Coupon Scraper
//!
//! Scrapes coupon-code listings from third-party coupon sites, normalizes
//! them into a common schema, and writes one JSON file per merchant domain.
//!
//! ## Usage
//!
//! ```sh
//! coupon_scraper                      # full run into ./coupons_data
//! RUST_LOG=debug coupon_scraper -o /srv/coupons
//! ```
//!
//! ## Architecture
//!
//! The run is strictly sequential:
//! 1. **Prepare**: Create and probe the output directory
//! 2. **Savings.com**: Index merchant coupon pages from the sitemap
//! 3. **Coupons.com**: Walk the shop directory, fetch each merchant's
//!    `__NEXT_DATA__`, normalize its code vouchers, and write the file
//!
//! Both adapters share one HTTP connection pool.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod fetch;
mod models;
mod next_data;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use fetch::HttpFetcher;
use scrapers::{couponsdotcom, savingscom};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("Preparing...");

    let args = Cli::parse();
    let policy = args.scrape_policy();
    debug!(?args, ?policy, "Parsed CLI arguments");

    ensure_writable_dir(&args.output_dir).await?;
    let http = HttpFetcher::new()?;

    info!("Starting...");

    if args.skip_sitemap {
        info!("Skipping Savings.com");
    } else {
        info!("---savings.com---");
        let merchant_urls = savingscom::index_merchants(&http).await?;
        info!(count = merchant_urls.len(), "Savings.com extraction not implemented; URLs indexed only");
    }

    if args.skip_listing {
        info!("Skipping Coupons.com");
    } else {
        info!("---coupons.com---");
        couponsdotcom::download_coupons(&http, &args.output_dir, &policy).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
