//! Error taxonomy for fetching, extracting, and persisting coupons.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(r#"<script id="__NEXT_DATA__" type="application/json"> tag not found on: {url}"#)]
    MissingNextData { url: String },

    #[error("JSON error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed sitemap: {0}")]
    Sitemap(String),

    #[error("voucher {id} skipped: {reason}")]
    Voucher { id: String, reason: String },

    #[error("failed writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
