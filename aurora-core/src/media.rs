use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ResolverError;
use crate::http::read_json;

const GIPHY_BASE_URL: &str = "https://api.giphy.com/v1";

/// Image search collaborator: best-matching preview URL for a query.
pub trait MediaSearch: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<Option<String>, ResolverError>> + Send;
}

impl<S: MediaSearch> MediaSearch for Arc<S> {
    async fn search(&self, query: &str) -> Result<Option<String>, ResolverError> {
        self.as_ref().search(query).await
    }
}

/// An unconfigured search never finds anything.
impl<S: MediaSearch> MediaSearch for Option<S> {
    async fn search(&self, query: &str) -> Result<Option<String>, ResolverError> {
        match self {
            Some(inner) => inner.search(query).await,
            None => Ok(None),
        }
    }
}

/// Client for the Giphy search API.
pub struct GiphyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GiphyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, GIPHY_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Extracts the first result's medium preview URL from a search response.
    pub fn parse_search_response(body: Value) -> Result<Option<String>, ResolverError> {
        let parsed: SearchResponse = serde_json::from_value(body)?;

        Ok(parsed
            .data
            .into_iter()
            .next()
            .and_then(|gif| gif.images)
            .and_then(|images| images.downsized_medium)
            .and_then(|rendition| rendition.url)
            .filter(|url| !url.is_empty()))
    }
}

impl MediaSearch for GiphyClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Option<String>, ResolverError> {
        let response = self
            .http
            .get(format!("{}/gifs/search", self.base_url))
            .query(&[("q", query), ("api_key", self.api_key.as_str()), ("limit", "1")])
            .send()
            .await?;

        let body = read_json::<ResolverError>(response).await?;
        let url = Self::parse_search_response(body)?;

        debug!(found = url.is_some(), "Giphy search finished");
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Gif>,
}

#[derive(Debug, Deserialize)]
struct Gif {
    images: Option<GifImages>,
}

#[derive(Debug, Deserialize)]
struct GifImages {
    downsized_medium: Option<Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    url: Option<String>,
}

/// Turns an alt text into an image URL, swallowing lookup failures.
pub struct MediaResolver<S> {
    search: S,
}

impl<S: MediaSearch> MediaResolver<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }

    /// Returns `None` when nothing matched or the lookup failed.
    pub async fn resolve(&self, query: &str) -> Option<String> {
        match self.search.search(query).await {
            Ok(url) => url,
            Err(e) => {
                warn!(query, error = %e, "media lookup failed");
                None
            }
        }
    }
}
