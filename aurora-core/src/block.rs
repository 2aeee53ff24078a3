use serde::Serialize;

use crate::message::Role;

/// Player URL prefix for [`ContentBlock::Embed`].
pub const SPOTIFY_EMBED_BASE_URL: &str = "https://open.spotify.com/embed/track/";

/// One renderable unit derived from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Markdown source, rendered as-is.
    Text { markdown: String },
    Image { url: String, alt: String },
    /// Music player for a track.
    Embed { track_id: String },
}

impl ContentBlock {
    pub fn text(markdown: impl Into<String>) -> Self {
        ContentBlock::Text {
            markdown: markdown.into(),
        }
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        ContentBlock::Image {
            url: url.into(),
            alt: alt.into(),
        }
    }

    pub fn embed(track_id: impl Into<String>) -> Self {
        ContentBlock::Embed {
            track_id: track_id.into(),
        }
    }

    /// Player URL for embed blocks.
    pub fn embed_url(&self) -> Option<String> {
        match self {
            ContentBlock::Embed { track_id } => Some(format!("{}{}", SPOTIFY_EMBED_BASE_URL, track_id)),
            _ => None,
        }
    }
}

/// Derived view of one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedMessage {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}
