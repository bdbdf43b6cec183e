use log::{debug, info, warn};
use thiserror::Error;

use crate::Segment;

/// Fallback languages tried after the user's preference
const FALLBACK_LANGUAGES: [&str; 4] = ["zh", "en", "zh-TW", "zh-CN"];

/// Languages used for the last-resort direct fetch
const DIRECT_FETCH_FALLBACKS: [&str; 2] = ["zh", "en"];

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("此影片已停用字幕功能")]
    Disabled,

    #[error("影片不存在或無法存取")]
    Unavailable,

    #[error("YouTube 字幕服務暫時無法使用，請稍後再試")]
    Transient,

    #[error("字幕內容為空")]
    Empty,

    #[error("無法找到任何可用的字幕")]
    NotFound,

    #[error("無法取得影片字幕：{0}")]
    Request(#[from] reqwest::Error),

    #[error("無法取得影片字幕：{0}")]
    Other(String),
}

impl TranscriptError {
    /// Disabled and unavailable videos won't change between attempts
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TranscriptError::Disabled | TranscriptError::Unavailable)
    }
}

/// One caption stream offered for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
    pub url: String,
}

impl CaptionTrack {
    fn kind_label(&self) -> &'static str {
        if self.is_generated { "自動生成" } else { "手動" }
    }
}

/// Source of caption tracks and their segments
#[allow(async_fn_in_trait)]
pub trait TranscriptProvider {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError>;

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<Segment>, TranscriptError>;

    /// Fetch segments without a track listing, trying `languages` in order
    async fn fetch_direct(&self, video_id: &str, languages: &[String]) -> Result<Vec<Segment>, TranscriptError>;
}

/// Ordered, de-duplicated language preference list
pub fn preferred_languages(language: &str) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    for lang in std::iter::once(language).chain(FALLBACK_LANGUAGES) {
        if !lang.is_empty() && !langs.iter().any(|l| l == lang) {
            langs.push(lang.to_string());
        }
    }
    langs
}

/// Order tracks for fetching: preferred languages first (in preference
/// order), then every remaining track in listing order
pub fn rank_tracks<'a>(tracks: &'a [CaptionTrack], preferred: &[String]) -> Vec<&'a CaptionTrack> {
    let mut ranked: Vec<&CaptionTrack> = Vec::with_capacity(tracks.len());
    for lang in preferred {
        ranked.extend(tracks.iter().filter(|t| &t.language_code == lang));
    }
    let preferred_count = ranked.len();
    for track in tracks {
        if !ranked[..preferred_count].iter().any(|r| std::ptr::eq(*r, track)) {
            ranked.push(track);
        }
    }
    ranked
}

/// Join segment texts into a single transcript string
pub fn join_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
}

async fn fetch_from_tracks<P: TranscriptProvider>(
    provider: &P,
    tracks: &[CaptionTrack],
    preferred: &[String],
) -> Option<Vec<Segment>> {
    let ranked = rank_tracks(tracks, preferred);
    let preferred_found = ranked.first().is_some_and(|t| preferred.contains(&t.language_code));
    if !preferred_found && !ranked.is_empty() {
        println!("⚠ 未找到偏好語言字幕，嘗試取得其他可用字幕...");
    }

    for track in ranked {
        match provider.fetch_track(track).await {
            Ok(segments) => {
                println!("✓ 找到 {} 字幕（{}）", track.language_code, track.kind_label());
                return Some(segments);
            }
            Err(e) => debug!("Track {} failed: {e}", track.language_code),
        }
    }
    None
}

/// Fetch a transcript, escalating to a direct fetch when no listed track works
pub async fn fetch_required<P: TranscriptProvider>(
    provider: &P,
    video_id: &str,
    language: &str,
) -> Result<String, TranscriptError> {
    let preferred = preferred_languages(language);

    // An unplayable watch page can still have timedtext captions
    let mut unavailable = false;
    let segments = match provider.list_tracks(video_id).await {
        Ok(tracks) => fetch_from_tracks(provider, &tracks, &preferred).await,
        Err(TranscriptError::Disabled) => return Err(TranscriptError::Disabled),
        Err(e) => {
            debug!("Listing tracks for {video_id} failed: {e}");
            unavailable = matches!(e, TranscriptError::Unavailable);
            None
        }
    };

    let segments = match segments {
        Some(segments) => segments,
        None => {
            let direct: Vec<String> = preferred_languages(language)
                .into_iter()
                .filter(|l| l == language || DIRECT_FETCH_FALLBACKS.contains(&l.as_str()))
                .collect();
            info!("Falling back to direct fetch for {video_id} with {direct:?}");
            match provider.fetch_direct(video_id, &direct).await {
                Ok(segments) => segments,
                Err(TranscriptError::Unavailable) => return Err(TranscriptError::Unavailable),
                Err(_) if unavailable => return Err(TranscriptError::Unavailable),
                Err(e) => {
                    debug!("Direct fetch for {video_id} failed: {e}");
                    return Err(TranscriptError::NotFound);
                }
            }
        }
    };

    let text = join_segments(&segments);
    if text.trim().is_empty() {
        return Err(TranscriptError::Empty);
    }

    println!("✓ 已取得字幕（共 {} 字元）", text.chars().count());
    Ok(text)
}

/// Try to fetch a transcript; any failure yields `None`
pub async fn fetch_best_effort<P: TranscriptProvider>(provider: &P, video_id: &str, language: &str) -> Option<String> {
    let preferred = preferred_languages(language);

    let tracks = match provider.list_tracks(video_id).await {
        Ok(tracks) => tracks,
        Err(e) => {
            warn!("No transcript for {video_id}: {e}");
            return None;
        }
    };

    let Some(segments) = fetch_from_tracks(provider, &tracks, &preferred).await else {
        warn!("No transcript for {video_id}: {}", TranscriptError::NotFound);
        return None;
    };
    let text = join_segments(&segments);
    if text.trim().is_empty() {
        warn!("No transcript for {video_id}: {}", TranscriptError::Empty);
        return None;
    }

    println!("✓ 已取得字幕（共 {} 字元）", text.chars().count());
    Some(text)
}
