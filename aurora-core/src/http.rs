use serde_json::Value;

use crate::error::{CompletionError, ResolverError};

/// Non-success HTTP status with the best error message the body offered.
#[derive(Debug)]
pub(crate) struct ApiStatus {
    pub status: u16,
    pub message: String,
}

impl From<ApiStatus> for CompletionError {
    fn from(s: ApiStatus) -> Self {
        CompletionError::Api {
            status: s.status,
            message: s.message,
        }
    }
}

impl From<ApiStatus> for ResolverError {
    fn from(s: ApiStatus) -> Self {
        ResolverError::Api {
            status: s.status,
            message: s.message,
        }
    }
}

/// Reads a response body as JSON, mapping non-2xx statuses to [`ApiStatus`].
pub(crate) async fn read_json<E>(response: reqwest::Response) -> Result<Value, E>
where
    E: From<reqwest::Error> + From<serde_json::Error> + From<ApiStatus>,
{
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| error_message(&body))
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ApiStatus {
            status: status.as_u16(),
            message,
        }
        .into());
    }

    Ok(serde_json::from_str(&text)?)
}

/// Pulls a human-readable message out of the error shapes the three services use.
fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("error").and_then(|e| e.get("message")),
        body.get("error_description"),
        body.get("message"),
        body.get("meta").and_then(|m| m.get("msg")),
        body.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(String::from)
}
