use std::time::Duration;

use eyre::{Result, bail};
use log::{debug, warn};
use serde::Deserialize;

const OEMBED_URL: &str = "https://www.youtube.com/oembed";
const OEMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Flat metadata record for one video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub author_name: String,
    pub description: String,
    pub thumbnail_url: String,
    pub html: String,
    pub duration: u64,
    pub view_count: u64,
    pub like_count: u64,
    pub published_at: String,
    pub tags: Vec<String>,
}

impl VideoMetadata {
    /// Record used when the lookup fails
    pub fn placeholder(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: format!("Video {video_id}"),
            author_name: "Unknown".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            html: String::new(),
            duration: 0,
            view_count: 0,
            like_count: 0,
            published_at: String::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: Option<String>,
    author_name: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
    html: Option<String>,
}

/// Source of video metadata; lookups never fail, they degrade
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    async fn fetch_metadata(&self, video_id: &str) -> VideoMetadata;
}

/// YouTube's public oEmbed endpoint
pub struct OembedClient {
    client: reqwest::Client,
}

impl OembedClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn lookup(&self, video_id: &str) -> Result<VideoMetadata> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching oEmbed metadata for {watch_url}");

        let resp = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .timeout(OEMBED_TIMEOUT)
            .send()
            .await?;

        if resp.status() != reqwest::StatusCode::OK {
            bail!("oEmbed returned {}", resp.status());
        }

        let body = resp.text().await?;
        parse_oembed(video_id, &body)
    }
}

impl MetadataSource for OembedClient {
    async fn fetch_metadata(&self, video_id: &str) -> VideoMetadata {
        match self.lookup(video_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                println!("警告：無法取得完整影片資訊：{e}");
                warn!("oEmbed lookup for {video_id} failed: {e}");
                VideoMetadata::placeholder(video_id)
            }
        }
    }
}

/// Parse an oEmbed body, keeping placeholder values for missing fields
pub fn parse_oembed(video_id: &str, body: &str) -> Result<VideoMetadata> {
    let data: OembedResponse = serde_json::from_str(body)?;
    let defaults = VideoMetadata::placeholder(video_id);
    Ok(VideoMetadata {
        title: data.title.unwrap_or(defaults.title),
        author_name: data.author_name.unwrap_or(defaults.author_name),
        description: data.description.unwrap_or(defaults.description),
        thumbnail_url: data.thumbnail_url.unwrap_or_default(),
        html: data.html.unwrap_or_default(),
        ..VideoMetadata::placeholder(video_id)
    })
}
