mod client;
mod convert;

use std::future::Future;

use crate::error::CompletionError;
use crate::message::Message;

pub use client::OpenRouterClient;
pub use convert::{GenerationParams, build_request_body, parse_response};

/// What the gateway answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Well-formed response that carried no reply (no choice, message or content).
    Empty,
}

/// Chat-completion gateway.
///
/// Receives the full transcript, system instruction first, and returns the
/// first generated reply.
pub trait ChatCompletion: Send + Sync {
    fn complete(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<Reply, CompletionError>> + Send;
}
