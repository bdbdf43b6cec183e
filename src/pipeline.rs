use chrono::Local;
use eyre::Result;
use log::{info, warn};

use crate::Variant;
use crate::chunk::split_into_chunks;
use crate::config::Settings;
use crate::metadata::{MetadataSource, OembedClient, VideoMetadata};
use crate::output::Report;
use crate::retry::{RetryPolicy, retry, tokio_sleep};
use crate::summarize::{
    GeminiClient, TextGenerator, metadata_prompt, summarize, synthesis_prompt, transcript_prompt,
};
use crate::transcript::{TranscriptError, TranscriptProvider, fetch_best_effort, fetch_required};
use crate::youtube::InnerTubeClient;

/// Outcome of summarizing one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSummary {
    Summarized(String),
    Failed(String),
}

impl ChunkSummary {
    fn render(&self, number: usize) -> String {
        match self {
            ChunkSummary::Summarized(text) => format!("區塊 {number} 摘要：\n{text}\n"),
            ChunkSummary::Failed(_) => format!("區塊 {number}：處理失敗\n"),
        }
    }
}

/// Finished summary, ready to be written out
#[derive(Debug, Clone)]
pub struct Summary {
    pub metadata: VideoMetadata,
    pub variant: Variant,
    pub body: String,
}

/// Metadata, transcript and generator wired into one run
pub struct Pipeline<M, T, G> {
    pub metadata: M,
    pub transcripts: T,
    pub generator: G,
    pub language: String,
    pub max_chunk_size: usize,
    pub retry: RetryPolicy,
    /// Also retry disabled/unavailable transcript failures
    pub retry_permanent_failures: bool,
}

impl Pipeline<OembedClient, InnerTubeClient, GeminiClient> {
    /// Pipeline backed by oEmbed, InnerTube captions and Gemini
    pub fn connect(settings: &Settings, api_key: &str) -> Self {
        let client = reqwest::Client::new();
        Self {
            metadata: OembedClient::new(client.clone()),
            transcripts: InnerTubeClient::new(client.clone(), &settings.language),
            generator: GeminiClient::new(client, api_key, &settings.model, &settings.api_base),
            language: settings.language.clone(),
            max_chunk_size: settings.max_chunk_size,
            retry: RetryPolicy::default(),
            retry_permanent_failures: settings.retry_permanent_failures,
        }
    }
}

impl<M, T, G> Pipeline<M, T, G>
where
    M: MetadataSource,
    T: TranscriptProvider,
    G: TextGenerator,
{
    async fn load_metadata(&self, video_id: &str) -> VideoMetadata {
        println!("正在處理影片：{video_id}");
        let metadata = self.metadata.fetch_metadata(video_id).await;
        println!("影片標題：{}", metadata.title);
        metadata
    }

    async fn required_transcript(&self, video_id: &str) -> Result<String, TranscriptError> {
        let max_attempts = self.retry.max_attempts;
        let retry_all = self.retry_permanent_failures;
        let should_retry = |e: &TranscriptError| retry_all || e.is_retryable();
        retry(self.retry, tokio_sleep, should_retry, |attempt| {
            println!("正在取得字幕... (嘗試 {attempt}/{max_attempts})");
            fetch_required(&self.transcripts, video_id, &self.language)
        })
        .await
    }

    /// Transcript-required run: chunk, summarize each chunk, then synthesize
    pub async fn summarize_with_transcript(&self, video_id: &str) -> Result<Summary> {
        let metadata = self.load_metadata(video_id).await;

        let transcript = self.required_transcript(video_id).await?;
        println!("字幕長度：{} 字元", transcript.chars().count());

        let chunks = split_into_chunks(&transcript, self.max_chunk_size);
        println!("分為 {} 個區塊處理", chunks.len());
        info!("Transcript for {video_id} split into {} chunks", chunks.len());

        let mut results = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            println!("正在處理區塊 {}/{}...", i + 1, chunks.len());
            match summarize(&self.generator, &transcript_prompt(&metadata, chunk)).await {
                Ok(text) => results.push(ChunkSummary::Summarized(text)),
                Err(e) if chunks.len() == 1 => return Err(e),
                Err(e) => {
                    println!("區塊 {} 處理失敗：{e:#}", i + 1);
                    warn!("Chunk {} of {video_id} failed: {e:#}", i + 1);
                    results.push(ChunkSummary::Failed(format!("{e:#}")));
                }
            }
        }

        let body = self.combine(&metadata.title, &results).await;
        Ok(Summary {
            metadata,
            variant: Variant::Transcript,
            body,
        })
    }

    async fn combine(&self, title: &str, results: &[ChunkSummary]) -> String {
        let details = results
            .iter()
            .enumerate()
            .map(|(i, r)| r.render(i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let combined = format!("影片標題：{title}\n\n{details}");

        if results.len() < 2 {
            return combined;
        }

        println!("正在生成整體摘要...");
        match summarize(&self.generator, &synthesis_prompt(&combined)).await {
            Ok(overall) => format!("影片標題：{title}\n\n整體摘要：\n{overall}\n\n詳細摘要：\n{details}"),
            Err(e) => {
                println!("整體摘要生成失敗：{e:#}");
                warn!("Synthesis failed: {e:#}");
                combined
            }
        }
    }

    /// Metadata-only run: uses a transcript if one happens to be available
    pub async fn summarize_metadata_only(&self, video_id: &str) -> Result<Summary> {
        let metadata = self.load_metadata(video_id).await;
        println!("頻道名稱：{}", metadata.author_name);

        let transcript = fetch_best_effort(&self.transcripts, video_id, &self.language).await;
        if transcript.is_some() {
            println!("✓ 找到字幕，將結合字幕和基本資訊生成摘要");
        } else {
            println!("⚠ 未找到字幕，將基於標題和描述生成摘要");
        }

        println!("正在生成摘要...");
        let body = summarize(&self.generator, &metadata_prompt(&metadata, transcript.as_deref())).await?;

        Ok(Summary {
            metadata,
            variant: Variant::MetadataOnly,
            body,
        })
    }

    /// Wrap a summary in a report stamped with the current time
    pub fn report(&self, summary: Summary) -> Report {
        Report {
            video_id: summary.metadata.video_id,
            title: Some(summary.metadata.title).filter(|t| !t.trim().is_empty()),
            model_name: self.generator.model_name(),
            variant: summary.variant,
            generated_at: Local::now(),
            body: summary.body,
        }
    }
}
