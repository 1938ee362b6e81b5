//! Normalized coupon records shared by every source adapter.
//!
//! This module defines the schema that each adapter maps its upstream
//! payload into:
//! - [`CouponSource`]: The site a coupon was scraped from
//! - [`Merchant`]: The retailer the coupon applies to
//! - [`Coupon`]: A single normalized coupon code
//!
//! Records are built per run, held in memory, and serialized as one JSON
//! array per merchant domain (see [`crate::outputs::json`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// The website a coupon was scraped from.
///
/// One static instance exists per adapter; it is embedded inline in every
/// [`Coupon`] it produces and is never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CouponSource {
    /// Human-readable site name, e.g. `"Coupons.com"`.
    pub name: String,
    /// The site's domain, e.g. `"coupons.com"`.
    pub domain: String,
    /// Whether the site earns affiliate commission on redemptions.
    pub is_affiliate_marketing: bool,
}

/// The retailer a coupon applies to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Merchant {
    /// Display name as reported upstream.
    pub name: String,
    /// Registrable domain of the retailer's URL, e.g. `"example.co.uk"`.
    pub domain: String,
}

/// A normalized coupon code.
///
/// # JSON Schema
///
/// Field names serialize as snake_case with `source` and `merchant` nested
/// inline, and `description` emitted as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Coupon {
    /// Deterministic identifier, see [`coupon_id`].
    pub id: String,
    /// Short headline of the offer.
    pub title: String,
    /// Synopsis and terms, if the upstream provided any.
    pub description: Option<String>,
    /// ISO-8601 expiry date-time.
    pub expiry: String,
    /// The code to enter at checkout.
    pub code: String,
    /// Where the coupon was found.
    pub source: CouponSource,
    /// Who the coupon is for.
    pub merchant: Merchant,
}

/// Compute the stable identifier for an upstream voucher.
///
/// The id is the lowercase hex SHA-512 digest of `"<prefix>_<upstream_id>"`.
/// SHA-512 only serves as a stable, non-reversible fingerprint here.
///
/// # Examples
///
/// ```ignore
/// let a = coupon_id("couponsdotcom", "12345");
/// assert_eq!(a, coupon_id("couponsdotcom", "12345"));
/// assert_eq!(a.len(), 128);
/// ```
pub fn coupon_id(prefix: &str, upstream_id: &str) -> String {
    let natural_key = format!("{prefix}_{upstream_id}");
    format!("{:x}", Sha512::digest(natural_key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_coupon() -> Coupon {
        Coupon {
            id: coupon_id("couponsdotcom", "abc"),
            title: "20% off sitewide".to_string(),
            description: None,
            expiry: "2025-12-31T23:59:59+00:00".to_string(),
            code: "SAVE20".to_string(),
            source: CouponSource {
                name: "Coupons.com".to_string(),
                domain: "coupons.com".to_string(),
                is_affiliate_marketing: true,
            },
            merchant: Merchant {
                name: "Example".to_string(),
                domain: "example.co.uk".to_string(),
            },
        }
    }

    #[test]
    fn test_coupon_id_is_deterministic() {
        assert_eq!(coupon_id("couponsdotcom", "42"), coupon_id("couponsdotcom", "42"));
    }

    #[test]
    fn test_coupon_id_depends_on_prefix_and_id() {
        let base = coupon_id("couponsdotcom", "42");
        assert_ne!(base, coupon_id("couponsdotcom", "43"));
        assert_ne!(base, coupon_id("savingscom", "42"));
    }

    #[test]
    fn test_coupon_id_is_hex_sha512() {
        let id = coupon_id("couponsdotcom", "42");
        assert_eq!(id.len(), 128);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_coupon_id_known_digest() {
        assert_eq!(
            coupon_id("couponsdotcom", "12345"),
            "b6ac121b71a2555fd49eb3caa64c252aaa6cc878873618274c10c04138c5c18d\
             3552fc0f3d51e8d192414814393a90f21e62f5953efaf0322f3fff1f4d90d838"
        );
    }

    #[test]
    fn test_coupon_serialization_shape() {
        let json = serde_json::to_value(sample_coupon()).unwrap();
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["source"]["is_affiliate_marketing"], true);
        assert_eq!(json["merchant"]["domain"], "example.co.uk");
        assert_eq!(json["code"], "SAVE20");
    }

    #[test]
    fn test_coupon_list_roundtrip() {
        let mut second = sample_coupon();
        second.description = Some("Terms: 30 days".to_string());
        let coupons = vec![sample_coupon(), second];

        let json = serde_json::to_string(&coupons).unwrap();
        let parsed: Vec<Coupon> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, coupons);
    }
}
