//! Utility functions for domain extraction, date normalization, logging, and
//! file system checks.
//!
//! This module provides helper functions used by the adapters:
//! - Public-suffix-aware registrable domain extraction
//! - Upstream expiry timestamps to ISO-8601
//! - String truncation for log previews
//! - Output directory validation

use crate::error::ScrapeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::{Host, Url};

/// Extract the registrable domain (eTLD+1) from a URL or bare hostname.
///
/// Uses the Public Suffix List, so multi-label suffixes are handled:
/// `https://shop.store.example.co.uk/deals` → `example.co.uk`.
///
/// # Returns
///
/// `None` for IP addresses, bare public suffixes, and inputs with no host.
pub fn registrable_domain(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = match Url::parse(raw) {
        Ok(url) if url.host().is_some() => url,
        // Scheme-less input such as "www.example.com/path"
        _ => Url::parse(&format!("https://{raw}")).ok()?,
    };

    let host = match parsed.host()? {
        Host::Domain(domain) => domain.trim_end_matches('.').to_ascii_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return None,
    };

    psl::domain_str(&host).map(str::to_string)
}

/// Normalize an upstream expiry timestamp to ISO-8601.
///
/// Offset-aware inputs keep their offset (`Z` becomes `+00:00`); naive
/// date-times and bare dates are rendered without one.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_expiry("2025-03-01T10:00:00Z").unwrap(), "2025-03-01T10:00:00+00:00");
/// assert_eq!(normalize_expiry("2025-03-01").unwrap(), "2025-03-01T00:00:00");
/// ```
pub fn normalize_expiry(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.to_rfc3339());
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(iso_naive(dt));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| iso_naive(d.and_time(NaiveTime::MIN)))
}

fn iso_naive(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), ScrapeError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| ScrapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(source) => Err(ScrapeError::Io {
            path: probe_path,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_domain_strips_subdomains() {
        assert_eq!(
            registrable_domain("shop.store.example.co.uk").as_deref(),
            Some("example.co.uk")
        );
        assert_eq!(
            registrable_domain("https://www.example.com/deals?x=1").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_registrable_domain_without_scheme() {
        assert_eq!(
            registrable_domain("www.Example.COM/path").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_registrable_domain_rejects_hostless_inputs() {
        assert_eq!(registrable_domain(""), None);
        assert_eq!(registrable_domain("   "), None);
        assert_eq!(registrable_domain("http://127.0.0.1:8080/"), None);
        assert_eq!(registrable_domain("co.uk"), None);
    }

    #[test]
    fn test_normalize_expiry_offsets() {
        assert_eq!(
            normalize_expiry("2025-03-01T10:00:00Z").as_deref(),
            Some("2025-03-01T10:00:00+00:00")
        );
        assert_eq!(
            normalize_expiry("2025-03-01T10:00:00.500-05:00").as_deref(),
            Some("2025-03-01T10:00:00.500-05:00")
        );
        assert_eq!(
            normalize_expiry("2025-03-01T10:00:00+0100").as_deref(),
            Some("2025-03-01T10:00:00+01:00")
        );
    }

    #[test]
    fn test_normalize_expiry_naive() {
        assert_eq!(
            normalize_expiry("2025-03-01 23:59:59").as_deref(),
            Some("2025-03-01T23:59:59")
        );
        assert_eq!(
            normalize_expiry("2025-03-01").as_deref(),
            Some("2025-03-01T00:00:00")
        );
    }

    #[test]
    fn test_normalize_expiry_rejects_garbage() {
        assert_eq!(normalize_expiry("soon"), None);
        assert_eq!(normalize_expiry(""), None);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_char_boundary() {
        let result = truncate_for_log("ééé", 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+4 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/coupons_data");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(stdfs::read_dir(&nested).unwrap().count(), 0);
    }
}
