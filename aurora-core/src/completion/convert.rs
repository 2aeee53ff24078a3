use serde::Deserialize;
use serde_json::{Value, json};

use super::Reply;
use crate::error::CompletionError;
use crate::message::Message;

/// Optional sampling parameters forwarded to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub seed: Option<u64>,
}

/// Converts a Message to OpenRouter JSON format.
fn message_to_json(msg: &Message) -> Value {
    json!({
        "role": msg.role.as_str(),
        "content": msg.content
    })
}

/// Builds the full OpenRouter API request body.
pub fn build_request_body(model: &str, messages: &[Message], params: Option<&GenerationParams>) -> Value {
    let messages_json: Vec<Value> = messages.iter().map(message_to_json).collect();

    let mut body = json!({
        "model": model,
        "messages": messages_json
    });

    if let Some(params) = params {
        apply_generation_params(&mut body, params);
    }

    body
}

/// Applies GenerationParams to the request body.
fn apply_generation_params(body: &mut Value, params: &GenerationParams) {
    if let Some(temp) = params.temperature {
        body["temperature"] = json!(temp);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(seed) = params.seed {
        body["seed"] = json!(seed);
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<ChoiceContent>,
}

/// Providers answer with either a plain string or a list of text parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChoiceContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

/// Parses an OpenRouter API response into the first choice's reply.
pub fn parse_response(response: Value) -> Result<Reply, CompletionError> {
    let parsed: CompletionResponse = serde_json::from_value(response)?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content);

    let reply = match content {
        Some(ChoiceContent::Text(text)) => Reply::Text(text),
        Some(ChoiceContent::Parts(parts)) => {
            let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
            if texts.is_empty() {
                Reply::Empty
            } else {
                Reply::Text(texts.concat())
            }
        }
        None => Reply::Empty,
    };

    Ok(reply)
}
