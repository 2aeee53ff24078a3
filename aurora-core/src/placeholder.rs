use std::sync::LazyLock;

use regex::Regex;

/// `![alt](url)` with lazy captures; `.` does not cross newlines.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("placeholder pattern is valid"));

/// A piece of message text, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Non-empty literal text between placeholders.
    Text(&'a str),
    Placeholder { alt: &'a str, url: &'a str },
}

/// Splits `content` into text and placeholder segments, left to right.
///
/// Matches never overlap and every match is reported. Empty text between
/// adjacent placeholders is omitted.
pub fn scan(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in PLACEHOLDER.captures_iter(content) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        if whole.start() > last_end {
            segments.push(Segment::Text(&content[last_end..whole.start()]));
        }

        segments.push(Segment::Placeholder {
            alt: caps.get(1).map_or("", |m| m.as_str()),
            url: caps.get(2).map_or("", |m| m.as_str()),
        });

        last_end = whole.end();
    }

    if last_end < content.len() {
        segments.push(Segment::Text(&content[last_end..]));
    }

    segments
}

/// True when `url` starts with `http://` or `https://` (any case).
pub fn is_absolute_url(url: &str) -> bool {
    let has_prefix = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    has_prefix("http://") || has_prefix("https://")
}
