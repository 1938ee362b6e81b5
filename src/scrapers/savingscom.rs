//! Savings.com merchant discovery.
//!
//! Savings.com publishes its merchant pages in a sitemap. This module only
//! indexes them: coupon extraction for this site is not built yet, and its
//! pages may need DOM scraping rather than `__NEXT_DATA__`.
//!
//! # URL Pattern
//!
//! Merchant coupon pages look like `https://www.savings.com/coupons/<merchant>`.
//! Store directory pages under `/coupons/stores/` are excluded.

use crate::error::ScrapeError;
use crate::fetch::FetchAsync;
use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::fmt::Display;
use tracing::{debug, info, instrument};

const SITEMAP_URL: &str = "https://www.savings.com/sitemap_merchants_1.xml";
const STORES_PATH: &str = "/coupons/stores/";

static MERCHANT_COUPON_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://www\.savings\.com/coupons/").expect("static merchant URL regex")
});

fn sitemap_err(e: impl Display) -> ScrapeError {
    ScrapeError::Sitemap(e.to_string())
}

fn resolve_entity(entity: &BytesRef<'_>) -> Result<String, ScrapeError> {
    if let Some(ch) = entity.resolve_char_ref().map_err(sitemap_err)? {
        return Ok(ch.to_string());
    }
    let name = entity.decode().map_err(sitemap_err)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| sitemap_err(format!("unknown entity &{name};")))
}

/// Collect the text of every `<loc>` element in a sitemap document.
pub fn parse_sitemap_locs(xml: &str) -> Result<Vec<String>, ScrapeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event().map_err(sitemap_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Event::Text(t) => {
                if let Some(buf) = current.as_mut() {
                    let raw = t.decode().map_err(sitemap_err)?;
                    buf.push_str(&unescape(&raw).map_err(sitemap_err)?);
                }
            }
            Event::CData(c) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&resolve_entity(&r)?);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locs)
}

/// Whether `url` is a per-merchant coupon page.
pub fn is_merchant_coupon_url(url: &str) -> bool {
    MERCHANT_COUPON_URL.is_match(url) && !url.contains(STORES_PATH)
}

/// Fetch the merchant sitemap and return every merchant coupon page URL.
#[instrument(level = "info", skip(fetcher))]
pub async fn index_merchants<F: FetchAsync>(fetcher: &F) -> Result<Vec<String>, ScrapeError> {
    let xml = fetcher.fetch_text(SITEMAP_URL).await?;
    let locs = parse_sitemap_locs(&xml)?;
    let merchant_urls: Vec<String> = locs
        .into_iter()
        .filter(|url| is_merchant_coupon_url(url))
        .collect();

    info!(count = merchant_urls.len(), source = SITEMAP_URL, "Indexed Savings.com merchant URLs");
    debug!(urls = ?merchant_urls, "Savings.com URLs");
    Ok(merchant_urls)
}
