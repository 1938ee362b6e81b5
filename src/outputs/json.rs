//! JSON output of per-merchant coupon lists.
//!
//! # Output Structure
//!
//! Files are named by the merchant's registrable domain:
//! ```text
//! coupons_data/
//! └── example.co.uk.json   # [{"id": "...", "title": "...", ...}, ...]
//! ```
//!
//! A later run that reaches the same merchant replaces the file wholesale.

use crate::error::ScrapeError;
use crate::models::Coupon;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Path of the output file for `merchant_domain` inside `output_dir`.
pub fn merchant_file_path(output_dir: &Path, merchant_domain: &str) -> PathBuf {
    output_dir.join(format!("{merchant_domain}.json"))
}

/// Write `coupons` as a JSON array to `{output_dir}/{merchant_domain}.json`.
///
/// The directory must already exist. Any previous file of the same name is
/// overwritten.
///
/// # Returns
///
/// The path written.
#[instrument(level = "info", skip(output_dir, coupons), fields(count = coupons.len()))]
pub async fn write_merchant_coupons(
    output_dir: &Path,
    merchant_domain: &str,
    coupons: &[Coupon],
) -> Result<PathBuf, ScrapeError> {
    let json = serde_json::to_string(coupons).map_err(|source| ScrapeError::Json {
        context: format!("serializing coupons for {merchant_domain}"),
        source,
    })?;

    let path = merchant_file_path(output_dir, merchant_domain);
    fs::write(&path, json)
        .await
        .map_err(|source| ScrapeError::Io {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), "Wrote merchant coupons");

    Ok(path)
}
