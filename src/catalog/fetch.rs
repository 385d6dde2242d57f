//! Page fetching for store and profile pages.
//!
//! The classifier and the profile listing only need "GET this address,
//! tell me where the redirects ended and what the body was". That is the
//! [`PageFetcher`] trait; [`HttpFetcher`] is the reqwest implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

/// Cookie value that satisfies the store's age verification gate
/// (a birth date far in the past)
pub const AGE_GATE_COOKIE: &str = "birthtime=-2208959999";

/// Errors from fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Unavailable(String),
}

/// A fetched page after redirects were followed
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final resolved address
    pub url: Url,

    /// Full response body
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Non-empty path segments of the final address
    /// (`/agecheck/app/70/` gives `["agecheck", "app", "70"]`)
    pub fn segments(&self) -> Vec<&str> {
        path_segments(&self.url)
    }
}

/// Non-empty path segments of an address
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Trait for page sources
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`, following redirects
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Fetcher with no extra headers
    pub fn new() -> Result<Self, FetchError> {
        Self::with_headers(HeaderMap::new())
    }

    /// Fetcher that sends the age gate cookie with every request
    pub fn with_age_gate_cookie() -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(AGE_GATE_COOKIE));
        Self::with_headers(headers)
    }

    fn with_headers(headers: HeaderMap) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self.client.get(parsed).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let body = response.text().await?;

        debug!(%url, final_url = %final_url, bytes = body.len(), "Fetched page");
        Ok(FetchedPage::new(final_url, body))
    }
}
