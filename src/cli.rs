//! Command-line interface definitions for the coupon scraper.
//!
//! Every option has a default, so running the binary with no arguments
//! performs the full scrape into `coupons_data/`.

use crate::fetch::DelayPolicy;
use crate::scrapers::ScrapePolicy;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the coupon scraper.
///
/// # Examples
///
/// ```sh
/// # Full scrape with the default 5-20s randomized delay
/// coupon_scraper
///
/// # Only the Coupons.com adapter, listing order, no delay
/// coupon_scraper --skip-sitemap --no-shuffle --min-delay-secs 0 --max-delay-secs 0
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory that receives one `<merchant-domain>.json` per merchant
    #[arg(short, long, env = "COUPONS_OUTPUT_DIR", default_value = "coupons_data")]
    pub output_dir: PathBuf,

    /// Lower bound (inclusive) of the randomized delay before each page fetch
    #[arg(long, default_value_t = 5)]
    pub min_delay_secs: u64,

    /// Upper bound (exclusive) of the randomized delay before each page fetch
    #[arg(long, default_value_t = 20)]
    pub max_delay_secs: u64,

    /// Visit merchants in listing order instead of shuffling them
    #[arg(long)]
    pub no_shuffle: bool,

    /// Skip the Savings.com sitemap discovery
    #[arg(long)]
    pub skip_sitemap: bool,

    /// Skip the Coupons.com merchant scrape
    #[arg(long)]
    pub skip_listing: bool,
}

impl Cli {
    /// Request-shaping policy described by the flags.
    pub fn scrape_policy(&self) -> ScrapePolicy {
        ScrapePolicy {
            delay: DelayPolicy::new(self.min_delay_secs, self.max_delay_secs),
            shuffle: !self.no_shuffle,
        }
    }
}
