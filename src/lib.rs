pub mod chunk;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod summarize;
pub mod transcript;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;

/// A single captioned segment
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Which pipeline produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Transcript required, chunked and synthesized
    Transcript,
    /// Metadata only, transcript used when available
    MetadataOnly,
}

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

static URL_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID
        r"youtube\.com/watch\?(?:[^#]*&)?v=([a-zA-Z0-9_-]{11})",
        // youtu.be/ID
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        // youtube.com/embed/ID
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        // youtube.com/v/ID
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
    ]
    .map(|p| Regex::new(p).expect("valid regex"))
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}
