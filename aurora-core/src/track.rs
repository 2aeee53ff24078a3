use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::error::ResolverError;
use crate::http::read_json;

const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Track search collaborator: id of the best-matching track for free text.
pub trait TrackSearch: Send + Sync {
    fn search(&self, text: &str) -> impl Future<Output = Result<Option<String>, ResolverError>> + Send;
}

impl<S: TrackSearch> TrackSearch for Arc<S> {
    async fn search(&self, text: &str) -> Result<Option<String>, ResolverError> {
        self.as_ref().search(text).await
    }
}

/// An unconfigured search never finds anything.
impl<S: TrackSearch> TrackSearch for Option<S> {
    async fn search(&self, text: &str) -> Result<Option<String>, ResolverError> {
        match self {
            Some(inner) => inner.search(text).await,
            None => Ok(None),
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Client for the Spotify Web API using the client-credentials flow.
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    api_base_url: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::with_urls(client_id, client_secret, SPOTIFY_API_BASE_URL, SPOTIFY_TOKEN_URL)
    }

    pub fn with_urls(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        api_base_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: api_base_url.into(),
            token_url: token_url.into(),
            token: Mutex::new(None),
        }
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    /// Returns a valid app token, fetching a new one when the cached one is stale.
    async fn access_token(&self) -> Result<String, ResolverError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Spotify access token");

        let response = self
            .http
            .post(&self.token_url)
            .header("Authorization", self.basic_auth())
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let body = read_json::<ResolverError>(response)
            .await
            .map_err(|e| match e {
                ResolverError::Api { status, message } => {
                    ResolverError::Auth(format!("{} ({})", message, status))
                }
                other => other,
            })?;
        let token = Self::parse_token_response(body, Instant::now())?;
        let value = token.value.clone();
        *cached = Some(token);

        Ok(value)
    }

    fn parse_token_response(body: Value, now: Instant) -> Result<AccessToken, ResolverError> {
        let parsed: TokenResponse = serde_json::from_value(body)?;
        if parsed.access_token.is_empty() {
            return Err(ResolverError::Auth("empty access token".to_string()));
        }

        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: now + lifetime,
        })
    }

    /// Extracts the first track id from a search response.
    pub fn parse_search_response(body: Value) -> Result<Option<String>, ResolverError> {
        let parsed: SearchResponse = serde_json::from_value(body)?;

        Ok(parsed
            .tracks
            .and_then(|page| page.items.into_iter().next())
            .and_then(|track| track.id)
            .filter(|id| !id.is_empty()))
    }
}

impl TrackSearch for SpotifyClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn search(&self, text: &str) -> Result<Option<String>, ResolverError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/search", self.api_base_url))
            .bearer_auth(token)
            .query(&[("q", text), ("type", "track"), ("limit", "1")])
            .send()
            .await?;

        let body = read_json::<ResolverError>(response).await?;
        let track_id = Self::parse_search_response(body)?;

        debug!(found = track_id.is_some(), "Spotify search finished");
        Ok(track_id)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    id: Option<String>,
}

/// Finds a track for message text, swallowing lookup failures.
pub struct TrackResolver<S> {
    search: S,
}

impl<S: TrackSearch> TrackResolver<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }

    /// Returns `None` when nothing matched or the lookup failed.
    pub async fn resolve(&self, text: &str) -> Option<String> {
        match self.search.search(text).await {
            Ok(track_id) => track_id,
            Err(e) => {
                warn!(error = %e, "track lookup failed");
                None
            }
        }
    }
}
