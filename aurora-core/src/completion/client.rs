use tracing::{debug, instrument};

use super::convert::{GenerationParams, build_request_body, parse_response};
use super::{ChatCompletion, Reply};
use crate::error::CompletionError;
use crate::http::read_json;
use crate::message::Message;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemma-3-27b-it:free";

/// Client for the OpenRouter API.
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    params: Option<GenerationParams>,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenRouterClient {
    /// Creates a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            params: None,
            referer: None,
            title: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets the `HTTP-Referer` and `X-Title` attribution headers.
    pub fn with_app_identity(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatCompletion for OpenRouterClient {
    #[instrument(skip(self, messages), fields(model = %self.model, turns = messages.len()))]
    async fn complete(&self, messages: &[Message]) -> Result<Reply, CompletionError> {
        let body = build_request_body(&self.model, messages, self.params.as_ref());

        debug!("Sending request to OpenRouter");

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            request = request.header("X-Title", title);
        }

        let response = request.json(&body).send().await?;
        let response_body = read_json::<CompletionError>(response).await?;

        debug!("Received successful response");

        parse_response(response_body)
    }
}
