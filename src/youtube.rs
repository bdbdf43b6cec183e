use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::Segment;
use crate::transcript::{CaptionTrack, TranscriptError, TranscriptProvider};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<RawCaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    runs: Option<Vec<TextRun>>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn text(&self) -> Option<String> {
        self.simple_text.clone().or_else(|| {
            self.runs
                .as_ref()
                .map(|runs| runs.iter().map(|r| r.text.as_str()).collect::<String>())
        })
    }
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        let language = raw
            .name
            .as_ref()
            .and_then(TrackName::text)
            .unwrap_or_else(|| raw.language_code.clone());
        CaptionTrack {
            is_generated: raw.kind.as_deref() == Some("asr"),
            language,
            language_code: raw.language_code,
            url: raw.base_url,
        }
    }
}

/// Caption tracks from YouTube's watch page and InnerTube player API
pub struct InnerTubeClient {
    client: reqwest::Client,
    hl: String,
}

impl InnerTubeClient {
    pub fn new(client: reqwest::Client, hl: &str) -> Self {
        Self {
            client,
            hl: hl.to_string(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, TranscriptError> {
        Ok(self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

impl TranscriptProvider for InnerTubeClient {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");

        let page_html = self.get_text(&watch_url).await?;
        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.hl,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracks_from_player_response(resp)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<Segment>, TranscriptError> {
        debug!("Fetching caption track: lang={}", track.language_code);
        let xml = self.get_text(&track.url).await?;
        parse_caption_xml(&xml)
    }

    async fn fetch_direct(&self, video_id: &str, languages: &[String]) -> Result<Vec<Segment>, TranscriptError> {
        for lang in languages {
            let url = format!("{TIMEDTEXT_URL}?v={video_id}&lang={lang}");
            debug!("Direct caption fetch: {url}");
            match self.get_text(&url).await.and_then(|xml| parse_caption_xml(&xml)) {
                Ok(segments) if !segments.is_empty() => return Ok(segments),
                Ok(_) => debug!("No direct captions for lang={lang}"),
                Err(e) => debug!("Direct fetch for lang={lang} failed: {e}"),
            }
        }
        Err(TranscriptError::NotFound)
    }
}

fn tracks_from_player_response(resp: InnerTubePlayerResponse) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let status = resp.playability_status.and_then(|p| p.status).unwrap_or_default();
    if matches!(status.as_str(), "ERROR" | "UNPLAYABLE" | "LOGIN_REQUIRED") {
        return Err(TranscriptError::Unavailable);
    }

    let tracks = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::Disabled);
    }

    Ok(tracks.into_iter().map(CaptionTrack::from).collect())
}

/// Watch-page spellings of the InnerTube key, most specific first
static API_KEY_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#,
        // ytcfg.set({...}) and inline script assignments
        r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#,
    ]
    .map(|p| Regex::new(p).expect("valid regex"))
});

fn extract_api_key(html: &str) -> Result<String, TranscriptError> {
    API_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| TranscriptError::Other("watch page has no InnerTube API key".to_string()))
}

/// `start` is required; `dur` may be missing on the final cue
fn cue_timing(tag: &quick_xml::events::BytesStart) -> Option<(f64, f64)> {
    let number = |value: &[u8]| std::str::from_utf8(value).ok()?.trim().parse::<f64>().ok();
    let mut start = None;
    let mut duration = 0.0;
    for attr in tag.attributes().flatten() {
        match attr.key.as_ref() {
            b"start" => start = number(&attr.value),
            b"dur" => duration = number(&attr.value).unwrap_or(0.0),
            _ => {}
        }
    }
    start.map(|s| (s, duration))
}

/// Parse timedtext XML; an empty or malformed payload is a transient failure
fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, TranscriptError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    if xml.trim().is_empty() {
        return Err(TranscriptError::Transient);
    }

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut pending = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            debug!("Malformed timedtext payload: {e}");
            TranscriptError::Transient
        })?;
        match event {
            Event::Start(tag) if tag.name().as_ref() == b"text" => pending = cue_timing(&tag),
            Event::Text(body) => {
                let Some((start, duration)) = pending.take() else {
                    continue;
                };
                // timedtext double-escapes entities inside cue bodies
                let once = body.unescape().unwrap_or_default();
                let text = html_escape::decode_html_entities(&once).into_owned();
                if !text.is_empty() {
                    segments.push(Segment { text, start, duration });
                }
            }
            Event::End(tag) if tag.name().as_ref() == b"text" => pending = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(segments)
}
