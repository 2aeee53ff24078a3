use futures::future::join_all;
use tracing::debug;

use crate::block::{ContentBlock, FormattedMessage};
use crate::media::{MediaResolver, MediaSearch};
use crate::message::{Message, Role};
use crate::placeholder::{self, Segment};
use crate::track::{TrackResolver, TrackSearch};

/// Words that make an assistant reply eligible for a music embed.
pub const MUSIC_KEYWORDS: [&str; 5] = ["play", "music", "track", "song", "recommend"];

/// Case-insensitive substring check against [`MUSIC_KEYWORDS`].
pub fn mentions_music(content: &str) -> bool {
    let lower = content.to_lowercase();
    MUSIC_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Derives renderable blocks from message text.
///
/// Nothing is cached: every call re-scans the text and repeats the lookups.
pub struct MessageFormatter<M, T> {
    media: MediaResolver<M>,
    tracks: TrackResolver<T>,
}

impl<M: MediaSearch, T: TrackSearch> MessageFormatter<M, T> {
    pub fn new(media: M, tracks: T) -> Self {
        Self {
            media: MediaResolver::new(media),
            tracks: TrackResolver::new(tracks),
        }
    }

    /// Formats `content` into text, image and embed blocks.
    ///
    /// Blocks from the placeholder scan come first, in source order, followed
    /// by at most one embed. Placeholders whose image cannot be found are
    /// dropped.
    pub async fn format(&self, content: &str, is_assistant: bool) -> Vec<ContentBlock> {
        let segments = placeholder::scan(content);

        let (resolved, track_id) = futures::join!(
            join_all(segments.iter().map(|segment| self.resolve_segment(segment))),
            self.music_enrichment(content, is_assistant),
        );

        let mut blocks: Vec<ContentBlock> = resolved.into_iter().flatten().collect();
        if let Some(track_id) = track_id {
            blocks.push(ContentBlock::embed(track_id));
        }
        blocks
    }

    pub async fn format_message(&self, message: &Message) -> Vec<ContentBlock> {
        self.format(&message.content, message.is_assistant()).await
    }

    /// Formats every non-system message, keeping history order.
    pub async fn format_history(&self, messages: &[Message]) -> Vec<FormattedMessage> {
        let pending = messages
            .iter()
            .filter(|message| message.role != Role::System)
            .map(|message| async move {
                FormattedMessage {
                    role: message.role,
                    blocks: self.format_message(message).await,
                }
            });

        join_all(pending).await
    }

    async fn resolve_segment(&self, segment: &Segment<'_>) -> Option<ContentBlock> {
        match *segment {
            Segment::Text(text) => Some(ContentBlock::text(text)),
            Segment::Placeholder { alt, url } => {
                if placeholder::is_absolute_url(url) {
                    return Some(ContentBlock::image(url, alt));
                }
                if alt.trim().is_empty() {
                    debug!(url, "dropping placeholder without alt text");
                    return None;
                }
                let url = self.media.resolve(alt).await?;
                Some(ContentBlock::image(url, alt))
            }
        }
    }

    async fn music_enrichment(&self, content: &str, is_assistant: bool) -> Option<String> {
        if !is_assistant || !mentions_music(content) {
            return None;
        }
        self.tracks.resolve(content).await
    }
}
