//! Coupons.com coupon scraper.
//!
//! Coupons.com is a Next.js affiliate-listing site. Both the shop directory
//! and every merchant page carry their data in `__NEXT_DATA__`, so nothing
//! here touches the rendered DOM.
//!
//! # URL Pattern
//!
//! - Directory: `https://www.coupons.com/coupon-codes`
//! - Merchant: `https://www.coupons.com/coupon-codes/<merchant-id>`
//!
//! The directory lists shops under `props.pageProps.allShops` as
//! `[label, [{"url": "/coupon-codes/<merchant-id>/"}, ...]]` pairs.

use crate::error::ScrapeError;
use crate::fetch::{FetchAsync, Throttled};
use crate::models::{Coupon, CouponSource, Merchant, coupon_id};
use crate::next_data::get_page_props;
use crate::outputs::json::write_merchant_coupons;
use crate::scrapers::ScrapePolicy;
use crate::utils::{normalize_expiry, registrable_domain};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

const LISTING_URL: &str = "https://www.coupons.com/coupon-codes";
const MERCHANT_PATH_SEGMENT: &str = "coupon-codes";
const ID_PREFIX: &str = "couponsdotcom";
const CODE_VOUCHER_TYPE: &str = "code";

/// The Coupons.com source record embedded in every coupon.
pub fn source() -> CouponSource {
    CouponSource {
        name: "Coupons.com".to_string(),
        domain: "coupons.com".to_string(),
        is_affiliate_marketing: true,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingProps {
    all_shops: Vec<ShopSection>,
}

#[derive(Debug, Deserialize)]
struct ShopSection(#[allow(dead_code)] Value, Vec<ShopLink>);

#[derive(Debug, Deserialize)]
struct ShopLink {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MerchantProps {
    vouchers: Vec<Voucher>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Voucher {
    id_pool: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    description: Option<String>,
    code: Option<String>,
    end_time: Option<String>,
    retailer: Option<Retailer>,
    terms_and_conditions: Option<TermsAndConditions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Retailer {
    name: Option<String>,
    merchant_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TermsAndConditions {
    captions: Option<Vec<Caption>>,
}

#[derive(Debug, Default, Deserialize)]
struct Caption {
    #[serde(default)]
    key: String,
    #[serde(default)]
    text: String,
}

/// Per-run counters, logged once the adapter finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub merchants: usize,
    pub failed: usize,
    pub without_codes: usize,
    pub files_written: usize,
}

/// Turn a shop's relative URL into its merchant id.
///
/// `/coupon-codes/acme/` → `acme`
fn merchant_id_from_url(url: &str) -> String {
    url.replace(MERCHANT_PATH_SEGMENT, "").replace('/', "")
}

fn merchant_url(merchant_id: &str) -> String {
    format!("{LISTING_URL}/{}", urlencoding::encode(merchant_id))
}

fn collect_merchant_ids(listing: &ListingProps) -> Vec<String> {
    listing
        .all_shops
        .iter()
        .flat_map(|ShopSection(_, shops)| shops)
        .filter_map(|shop| shop.url.as_deref())
        .map(merchant_id_from_url)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Build a coupon description from a synopsis and terms captions.
///
/// The synopsis comes first, then a blank line, then one `key: text` line
/// per caption. Returns `None` when there is nothing to say.
fn build_description(synopsis: Option<&str>, captions: &[Caption]) -> Option<String> {
    let terms = captions
        .iter()
        .map(|c| format!("{}: {}", c.key, c.text))
        .join("\n");

    let description = [synopsis.unwrap_or_default().trim(), terms.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .join("\n\n");

    (!description.is_empty()).then_some(description)
}

/// Map one upstream voucher to a [`Coupon`].
///
/// # Returns
///
/// - `Ok(None)` for anything that is not a discrete code (e.g. automatic sales)
/// - `Err(ScrapeError::Voucher)` when a required field is missing or invalid
fn normalize_voucher(voucher: &Voucher) -> Result<Option<Coupon>, ScrapeError> {
    if voucher.kind.as_deref() != Some(CODE_VOUCHER_TYPE) {
        return Ok(None);
    }

    let upstream_id = voucher.id_pool.as_deref().ok_or_else(|| ScrapeError::Voucher {
        id: "<unknown>".to_string(),
        reason: "missing idPool".to_string(),
    })?;
    let invalid = |reason: String| ScrapeError::Voucher {
        id: upstream_id.to_string(),
        reason,
    };

    let retailer = voucher
        .retailer
        .as_ref()
        .ok_or_else(|| invalid("missing retailer".to_string()))?;
    let merchant_url = retailer.merchant_url.as_deref().unwrap_or_default();
    let domain = registrable_domain(merchant_url)
        .ok_or_else(|| invalid(format!("no registrable domain in {merchant_url:?}")))?;

    let end_time = voucher
        .end_time
        .as_deref()
        .ok_or_else(|| invalid("missing endTime".to_string()))?;
    let expiry =
        normalize_expiry(end_time).ok_or_else(|| invalid(format!("unparseable endTime {end_time:?}")))?;

    let title = voucher
        .title
        .clone()
        .ok_or_else(|| invalid("missing title".to_string()))?;
    let code = voucher
        .code
        .clone()
        .ok_or_else(|| invalid("missing code".to_string()))?;

    let captions = voucher
        .terms_and_conditions
        .as_ref()
        .and_then(|t| t.captions.as_deref())
        .unwrap_or_default();

    Ok(Some(Coupon {
        id: coupon_id(ID_PREFIX, upstream_id),
        title,
        description: build_description(voucher.description.as_deref(), captions),
        expiry,
        code,
        source: source(),
        merchant: Merchant {
            name: retailer.name.clone().unwrap_or_else(|| domain.clone()),
            domain,
        },
    }))
}

/// Normalize every code voucher, logging and skipping malformed ones.
fn normalize_vouchers(merchant_id: &str, vouchers: &[Voucher]) -> Vec<Coupon> {
    vouchers
        .iter()
        .filter_map(|voucher| match normalize_voucher(voucher) {
            Ok(coupon) => coupon,
            Err(e) => {
                warn!(%merchant_id, error = %e, "Skipping voucher");
                None
            }
        })
        .collect()
}

/// Scrape every Coupons.com merchant and write one file per merchant domain.
///
/// Merchants are visited one at a time, in shuffled order unless the policy
/// says otherwise, with the policy's delay before every page fetch. A merchant
/// whose page cannot be fetched or parsed is logged and skipped.
///
/// # Errors
///
/// Fails if the shop directory cannot be read or an output file cannot be
/// written.
#[instrument(level = "info", skip(fetcher, output_dir, policy), fields(output_dir = %output_dir.display()))]
pub async fn download_coupons<F: FetchAsync>(
    fetcher: &F,
    output_dir: &Path,
    policy: &ScrapePolicy,
) -> Result<RunSummary, ScrapeError> {
    let fetcher = Throttled::new(fetcher, policy.delay);

    let listing: ListingProps = get_page_props(&fetcher, LISTING_URL).await?;
    let mut merchant_ids = collect_merchant_ids(&listing);
    policy.arrange(&mut merchant_ids);
    info!(count = merchant_ids.len(), "Iterating through Coupons.com merchants");

    let mut summary = RunSummary::default();
    for merchant_id in &merchant_ids {
        summary.merchants += 1;
        info!(%merchant_id, "Processing merchant");

        let url = merchant_url(merchant_id);
        let props: MerchantProps = match get_page_props(&fetcher, &url).await {
            Ok(props) => props,
            Err(e) => {
                error!(%merchant_id, error = %e, "Merchant fetch failed");
                summary.failed += 1;
                continue;
            }
        };

        let coupons = normalize_vouchers(merchant_id, &props.vouchers);
        let Some(merchant_domain) = coupons.last().map(|c| c.merchant.domain.clone()) else {
            debug!(%merchant_id, vouchers = props.vouchers.len(), "No code vouchers; nothing to write");
            summary.without_codes += 1;
            continue;
        };

        write_merchant_coupons(output_dir, &merchant_domain, &coupons).await?;
        summary.files_written += 1;
    }

    info!(
        merchants = summary.merchants,
        failed = summary.failed,
        without_codes = summary.without_codes,
        files_written = summary.files_written,
        "Finished Coupons.com"
    );
    Ok(summary)
}
