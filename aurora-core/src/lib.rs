//! Core of the aurora emotion-support chat.
//!
//! This crate turns raw chat text into renderable content blocks and keeps
//! the conversation with the completion gateway consistent:
//! - [`MessageFormatter`] scans messages for `![alt](url)` placeholders,
//!   resolves them into GIFs and appends a music embed to assistant replies
//!   that talk about music
//! - [`ConversationController`] owns the append-only history and guarantees
//!   at most one completion request in flight
//!
//! The three external services (OpenRouter, Giphy, Spotify) sit behind the
//! [`ChatCompletion`], [`MediaSearch`] and [`TrackSearch`] traits.
//!
//! # Example
//!
//! ```ignore
//! use aurora_core::{
//!     ConversationController, ConversationHistory, GiphyClient, MessageFormatter,
//!     OpenRouterClient, SpotifyClient, SubmitOutcome,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OpenRouterClient::new("your-api-key");
//!     let controller = ConversationController::new(client, ConversationHistory::default());
//!     let formatter = MessageFormatter::new(
//!         GiphyClient::new("giphy-key"),
//!         SpotifyClient::new("client-id", "client-secret"),
//!     );
//!
//!     if let SubmitOutcome::Replied(reply) = controller.submit("I feel anxious today", &[]).await {
//!         for block in formatter.format_message(&reply).await {
//!             println!("{:?}", block);
//!         }
//!     }
//! }
//! ```

mod block;
mod completion;
mod controller;
mod error;
mod formatter;
mod http;
mod media;
mod message;
mod placeholder;
mod track;

pub use block::{ContentBlock, FormattedMessage, SPOTIFY_EMBED_BASE_URL};
pub use completion::{
    ChatCompletion, GenerationParams, OpenRouterClient, Reply, build_request_body, parse_response,
};
pub use controller::{
    ControllerState, ConversationController, FAILURE_REPLY, FALLBACK_REPLY, IgnoreReason,
    SubmitOutcome,
};
pub use error::{CompletionError, ResolverError};
pub use formatter::{MUSIC_KEYWORDS, MessageFormatter, mentions_music};
pub use media::{GiphyClient, MediaResolver, MediaSearch};
pub use message::{ConversationHistory, DEFAULT_SYSTEM_INSTRUCTION, Message, Role};
pub use placeholder::{Segment, is_absolute_url, scan};
pub use track::{SpotifyClient, TrackResolver, TrackSearch};
