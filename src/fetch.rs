//! HTTP page fetching with a randomized request delay.
//!
//! This module provides the network seam used by every source adapter.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the adapters never talk to
//! `reqwest` directly:
//! - [`FetchAsync`]: Core trait defining an async "GET this URL as text"
//! - [`HttpFetcher`]: A shared `reqwest::Client` with browser-like headers
//! - [`Throttled`]: Decorator that sleeps for a [`DelayPolicy`] sample before
//!   delegating to any `FetchAsync` implementation
//!
//! # Delay Strategy
//!
//! The delay only shapes the request rate of a single sequential run. There is
//! no retry or backoff: a failed request is reported to the caller as-is.

use crate::error::ScrapeError;
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0";

/// Trait for fetching a page body.
///
/// Implementors return the response body as text. Tests substitute canned
/// pages through this seam.
pub trait FetchAsync {
    /// Fetch `url` and return its body.
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError>;
}

impl<T> FetchAsync for &T
where
    T: FetchAsync + ?Sized,
{
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        (**self).fetch_text(url).await
    }
}

/// Thin wrapper over a long-lived `reqwest::Client`.
///
/// Cloning is cheap and shares the underlying connection pool, so one client
/// is built per run and handed to every adapter.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client that presents itself as a desktop Firefox.
    pub fn new() -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("empty"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-origin"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchAsync for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        let res = self.client.get(url).send().await?.error_for_status();
        let body = match res {
            Ok(resp) => resp.text().await?,
            Err(e) => {
                warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "GET failed");
                return Err(e.into());
            }
        };
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes = body.len(),
            "GET succeeded"
        );
        Ok(body)
    }
}

/// Range of whole seconds to wait before each request.
///
/// A sample is drawn uniformly from `[min_secs, max_secs)`. When
/// `min_secs >= max_secs` the delay is a fixed `min_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayPolicy {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Draw the next delay.
    pub fn sample(&self) -> Duration {
        let secs = if self.min_secs >= self.max_secs {
            self.min_secs
        } else {
            rng().random_range(self.min_secs..self.max_secs)
        };
        Duration::from_secs(secs)
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

/// Wrapper that sleeps for a [`DelayPolicy`] sample before every request.
pub struct Throttled<T> {
    inner: T,
    policy: DelayPolicy,
}

impl<T> Throttled<T>
where
    T: FetchAsync,
{
    /// Wrap `inner` so each fetch is preceded by a randomized pause.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new()?;
    /// let fetcher = Throttled::new(http.clone(), DelayPolicy::default());
    /// ```
    pub fn new(inner: T, policy: DelayPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for Throttled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> FetchAsync for Throttled<T>
where
    T: FetchAsync,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let delay = self.policy.sample();
        if !delay.is_zero() {
            debug!(?delay, "Sleeping before request");
            sleep(delay).await;
        }
        self.inner.fetch_text(url).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned bodies keyed by URL and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct CannedFetcher {
        pub pages: HashMap<String, String>,
        pub requested: RefCell<Vec<String>>,
    }

    impl CannedFetcher {
        pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), body.into());
            self
        }
    }

    impl FetchAsync for CannedFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
            self.requested.borrow_mut().push(url.to_string());
            // Unknown URLs look like a page without the embedded payload.
            Ok(self
                .pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| "<html><body>Not found</body></html>".to_string()))
        }
    }

    #[test]
    fn test_delay_policy_default_range() {
        let policy = DelayPolicy::default();
        for _ in 0..200 {
            let secs = policy.sample().as_secs();
            assert!((5..20).contains(&secs), "sampled {secs}");
        }
    }

    #[test]
    fn test_delay_policy_fixed_when_bounds_collapse() {
        assert_eq!(DelayPolicy::new(3, 3).sample(), Duration::from_secs(3));
        assert_eq!(DelayPolicy::new(7, 2).sample(), Duration::from_secs(7));
    }

    #[test]
    fn test_delay_policy_none_is_zero() {
        assert!(DelayPolicy::none().sample().is_zero());
    }

    #[tokio::test]
    async fn test_throttled_delegates_to_inner() {
        let inner = CannedFetcher::default().with_page("https://a.test/", "hello");
        let fetcher = Throttled::new(inner, DelayPolicy::none());

        let body = fetcher.fetch_text("https://a.test/").await.unwrap();
        assert_eq!(body, "hello");
        assert_eq!(*fetcher.inner.requested.borrow(), vec!["https://a.test/".to_string()]);
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }
}
