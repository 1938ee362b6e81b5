//! Coupon source adapters.
//!
//! Each adapter knows one site's URL layout and payload shape and maps it
//! into the normalized [`crate::models`] schema.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Coupons.com | [`couponsdotcom`] | `__NEXT_DATA__` JSON | Full extraction, one file per merchant |
//! | Savings.com | [`savingscom`] | Sitemap XML | Merchant URL discovery only |
//!
//! # Request Shaping
//!
//! Adapters run strictly one after another and fetch one page at a time.
//! [`ScrapePolicy`] controls the only two knobs: the randomized delay before
//! each page fetch and whether merchants are visited in shuffled order.

pub mod couponsdotcom;
pub mod savingscom;

use crate::fetch::DelayPolicy;
use rand::rng;
use rand::seq::SliceRandom;

/// Rate-shaping heuristics applied while enumerating a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapePolicy {
    /// Pause drawn before every page fetch.
    pub delay: DelayPolicy,
    /// Visit merchants in random order instead of listing order.
    pub shuffle: bool,
}

impl ScrapePolicy {
    /// Reorder `items` in place if shuffling is enabled.
    pub fn arrange<T>(&self, items: &mut [T]) {
        if self.shuffle {
            items.shuffle(&mut rng());
        }
    }
}

impl Default for ScrapePolicy {
    fn default() -> Self {
        Self {
            delay: DelayPolicy::default(),
            shuffle: true,
        }
    }
}
