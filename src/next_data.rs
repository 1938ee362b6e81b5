//! Extraction of the Next.js `__NEXT_DATA__` hydration payload.
//!
//! Both coupon sites are server-rendered Next.js apps. Every page embeds its
//! full page props as JSON:
//!
//! ```html
//! <script id="__NEXT_DATA__" type="application/json">
//! {"props": {"pageProps": { ... }}}
//! </script>
//! ```
//!
//! Reading that blob is far more stable than walking the rendered DOM, and it
//! stands in for the public API these sites do not offer.

use crate::error::ScrapeError;
use crate::fetch::FetchAsync;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

static NEXT_DATA_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script#__NEXT_DATA__[type="application/json"]"#)
        .expect("static __NEXT_DATA__ selector")
});

/// Pull the `__NEXT_DATA__` JSON out of an HTML document.
///
/// `url` is only used to name the page in errors.
///
/// # Errors
///
/// - [`ScrapeError::MissingNextData`] if no matching script tag exists
/// - [`ScrapeError::Json`] if the tag's text is not valid JSON
pub fn extract_next_data(html: &str, url: &str) -> Result<Value, ScrapeError> {
    let document = Html::parse_document(html);
    let Some(element) = document.select(&NEXT_DATA_SELECTOR).next() else {
        warn!(%url, preview = %truncate_for_log(html, 200), "No __NEXT_DATA__ tag");
        return Err(ScrapeError::MissingNextData {
            url: url.to_string(),
        });
    };

    let text = element.text().collect::<String>();
    debug!(%url, bytes = text.len(), "Found __NEXT_DATA__ payload");
    serde_json::from_str(&text).map_err(|source| ScrapeError::Json {
        context: url.to_string(),
        source,
    })
}

/// Fetch `url` and return its embedded `__NEXT_DATA__` payload.
///
/// Any delay policy belongs to the fetcher; pass a
/// [`Throttled`](crate::fetch::Throttled) one to space requests out.
#[instrument(level = "info", skip(fetcher))]
pub async fn get_next_data<F: FetchAsync>(fetcher: &F, url: &str) -> Result<Value, ScrapeError> {
    let html = fetcher.fetch_text(url).await?;
    extract_next_data(&html, url)
}

/// Fetch `url` and deserialize its payload into a typed view.
///
/// Shape mismatches surface as [`ScrapeError::Json`] instead of panics, so
/// callers can skip the page and move on.
pub async fn get_next_data_as<F, T>(fetcher: &F, url: &str) -> Result<T, ScrapeError>
where
    F: FetchAsync,
    T: DeserializeOwned,
{
    let value = get_next_data(fetcher, url).await?;
    serde_json::from_value(value).map_err(|source| ScrapeError::Json {
        context: url.to_string(),
        source,
    })
}

/// Top-level `__NEXT_DATA__` envelope around a page's props.
#[derive(Debug, Deserialize)]
pub struct NextPage<P> {
    pub props: NextProps<P>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextProps<P> {
    pub page_props: P,
}

/// Fetch `url` and deserialize `props.pageProps` into `P`.
pub async fn get_page_props<F, P>(fetcher: &F, url: &str) -> Result<P, ScrapeError>
where
    F: FetchAsync,
    P: DeserializeOwned,
{
    let page: NextPage<P> = get_next_data_as(fetcher, url).await?;
    Ok(page.props.page_props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::CannedFetcher;

    const PAGE: &str = r#"<!DOCTYPE html><html><head>
        <script id="other" type="application/json">{"wrong": true}</script>
        </head><body><div id="__next"></div>
        <script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"answer":42}}}</script>
        </body></html>"#;

    #[test]
    fn test_extracts_payload() {
        let data = extract_next_data(PAGE, "https://a.test/").unwrap();
        assert_eq!(data["props"]["pageProps"]["answer"], 42);
    }

    #[test]
    fn test_missing_tag_names_url() {
        let err = extract_next_data("<html><body></body></html>", "https://a.test/x").unwrap_err();
        match err {
            ScrapeError::MissingNextData { url } => assert_eq!(url, "https://a.test/x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_mime_type_is_missing() {
        let html = r#"<script id="__NEXT_DATA__" type="text/javascript">{}</script>"#;
        assert!(matches!(
            extract_next_data(html, "https://a.test/"),
            Err(ScrapeError::MissingNextData { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_json_error() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":</script>"#;
        assert!(matches!(
            extract_next_data(html, "https://a.test/"),
            Err(ScrapeError::Json { .. })
        ));
    }

    #[derive(Debug, Deserialize)]
    struct AnswerProps {
        answer: u32,
    }

    #[tokio::test]
    async fn test_get_page_props_typed_view() {
        let fetcher = CannedFetcher::default().with_page("https://a.test/", PAGE);
        let props: AnswerProps = get_page_props(&fetcher, "https://a.test/").await.unwrap();
        assert_eq!(props.answer, 42);
    }

    #[tokio::test]
    async fn test_get_page_props_shape_mismatch() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{}}</script>"#;
        let fetcher = CannedFetcher::default().with_page("https://a.test/", html);
        let res: Result<AnswerProps, _> = get_page_props(&fetcher, "https://a.test/").await;
        assert!(matches!(res, Err(ScrapeError::Json { .. })));
    }

    #[tokio::test]
    async fn test_get_next_data_missing_page() {
        let fetcher = CannedFetcher::default();
        let res = get_next_data(&fetcher, "https://a.test/missing").await;
        assert!(matches!(res, Err(ScrapeError::MissingNextData { .. })));
    }
}
