use eyre::{Result, WrapErr, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::metadata::VideoMetadata;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Generative-text completion backend
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable model name for report headers
    fn model_name(&self) -> String;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: &str, model: &str, api_base: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// The key travels in a header so it never shows up in URLs or error text
    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        self.client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating via Gemini with model {}", self.model);

        let resp = self.request(prompt).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let json: GenerateResponse = resp.json().await?;
        Ok(extract_gemini_text(&json))
    }

    fn model_name(&self) -> String {
        display_model_name(&self.model)
    }
}

fn extract_gemini_text(resp: &GenerateResponse) -> String {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Map known model ids to their marketing names
pub fn display_model_name(model: &str) -> String {
    match model {
        "gemini-2.0-flash" => "Gemini 2.0 Flash".to_string(),
        "gemini-2.0-flash-lite" => "Gemini 2.0 Flash-Lite".to_string(),
        "gemini-2.5-flash" => "Gemini 2.5 Flash".to_string(),
        "gemini-2.5-pro" => "Gemini 2.5 Pro".to_string(),
        other => other.to_string(),
    }
}

/// Run one prompt and return the trimmed, non-empty response
pub async fn summarize<G: TextGenerator>(generator: &G, prompt: &str) -> Result<String> {
    generate_non_empty(generator, prompt)
        .await
        .wrap_err("Google API 摘要生成失敗")
}

async fn generate_non_empty<G: TextGenerator>(generator: &G, prompt: &str) -> Result<String> {
    let text = generator.generate(prompt).await?;
    let text = text.trim();
    if text.is_empty() {
        bail!("API 回應為空");
    }
    Ok(text.to_string())
}

/// Prompt for one transcript chunk
pub fn transcript_prompt(metadata: &VideoMetadata, text: &str) -> String {
    format!(
        "請為以下 YouTube 影片字幕內容生成一個詳細的中文摘要：

影片標題：{title}
頻道名稱：{author}

{text}

請提供：
1. 影片主要內容概述
2. 關鍵要點（至少 3-5 個）
3. 重要結論或建議

摘要應該：
- 使用繁體中文
- 結構清晰，易於閱讀
- 包含具體的資訊和細節
- 長度適中（約 200-500 字）
",
        title = metadata.title,
        author = metadata.author_name,
    )
}

/// Prompt for the overall summary of several chunk summaries
pub fn synthesis_prompt(combined: &str) -> String {
    format!(
        "以下是同一部 YouTube 影片各區塊的摘要，請整合成一份完整的中文摘要：

{combined}

請提供：
1. 影片主要內容概述
2. 關鍵要點（至少 3-5 個）
3. 重要結論或建議

摘要應該：
- 使用繁體中文
- 結構清晰，易於閱讀
- 長度適中（約 200-500 字）
"
    )
}

/// Prompt built from metadata, with the transcript when there is one
pub fn metadata_prompt(metadata: &VideoMetadata, transcript: Option<&str>) -> String {
    let mut lines = vec![
        "請根據以下 YouTube 影片資訊生成一個詳細的中文摘要：".to_string(),
        String::new(),
        format!("影片標題：{}", metadata.title),
        format!("頻道名稱：{}", metadata.author_name),
        format!("影片描述：{}", metadata.description),
        format!("影片 ID：{}", metadata.video_id),
        String::new(),
    ];

    match transcript {
        Some(text) => {
            lines.push("影片字幕內容：".to_string());
            lines.push(text.to_string());
        }
        None => lines.push("注意：此影片沒有可用的字幕，請根據標題、描述和頻道資訊進行分析。".to_string()),
    }

    lines.extend(
        [
            "",
            "請提供：",
            "1. 影片主要內容概述（基於標題和描述）",
            "2. 預期關鍵要點（至少 3-5 個）",
            "3. 影片類型分析",
            "4. 目標觀眾分析",
            "5. 建議觀看重點",
            "",
            "摘要應該：",
            "- 使用繁體中文",
            "- 結構清晰，易於閱讀",
            "- 基於可用資訊進行合理推測",
            "- 長度適中（約 200-500 字）",
            "- 如果沒有字幕，請明確說明並提供基於標題描述的合理分析",
        ]
        .map(String::from),
    );

    lines.join("\n")
}


#[cfg(test)]
mod tests {
    use super::fake::FakeGenerator;
    use super::*;

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            title: "Test Video".to_string(),
            author_name: "Test Channel".to_string(),
            description: "A description".to_string(),
            ..VideoMetadata::placeholder("dQw4w9WgXcQ")
        }
    }

    #[test]
    fn test_extract_gemini_text() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{"text": "第一段。"}, {"text": "第二段。"}]
                    },
                    "finishReason": "STOP"
                }
            ]
        }))
        .unwrap();
        assert_eq!(extract_gemini_text(&resp), "第一段。第二段。");
    }

    #[test]
    fn test_extract_gemini_text_blocked() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(extract_gemini_text(&resp), "");
    }

    #[test]
    fn test_gemini_request_keeps_key_out_of_url() {
        let client = GeminiClient::new(reqwest::Client::new(), "SECRET_KEY_123", DEFAULT_MODEL, "https://example.com/");
        let req = client.request("hi").build().unwrap();
        assert_eq!(
            req.url().as_str(),
            "https://example.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(req.url().query().is_none());
        assert_eq!(req.headers()["x-goog-api-key"], "SECRET_KEY_123");
    }

    #[tokio::test]
    async fn test_gemini_transport_error_hides_key() {
        let client = GeminiClient::new(reqwest::Client::new(), "SECRET_KEY_123", DEFAULT_MODEL, "http://127.0.0.1:9");
        let err = summarize(&client, "hi").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Google API 摘要生成失敗"));
        assert!(!msg.contains("SECRET_KEY_123"));
    }

    #[test]
    fn test_display_model_name() {
        assert_eq!(display_model_name("gemini-2.0-flash"), "Gemini 2.0 Flash");
        assert_eq!(display_model_name("gemini-exp-1206"), "gemini-exp-1206");
    }

    #[test]
    fn test_transcript_prompt_contains_text() {
        let prompt = transcript_prompt(&sample_metadata(), "句子一。句子二。");
        assert!(prompt.contains("句子一。句子二。"));
        assert!(prompt.contains("影片標題：Test Video"));
        assert!(prompt.contains("使用繁體中文"));
    }

    #[test]
    fn test_metadata_prompt_without_transcript() {
        let prompt = metadata_prompt(&sample_metadata(), None);
        assert!(prompt.contains("頻道名稱：Test Channel"));
        assert!(prompt.contains("影片描述：A description"));
        assert!(prompt.contains("此影片沒有可用的字幕"));
        assert!(!prompt.contains("影片字幕內容"));
    }

    #[test]
    fn test_metadata_prompt_with_transcript() {
        let prompt = metadata_prompt(&sample_metadata(), Some("hello world"));
        assert!(prompt.contains("影片字幕內容：\nhello world"));
        assert!(!prompt.contains("此影片沒有可用的字幕"));
    }

    #[tokio::test]
    async fn test_summarize_trims_response() {
        let generator = FakeGenerator::new(vec![Ok("  摘要內容\n\n")]);
        assert_eq!(summarize(&generator, "prompt").await.unwrap(), "摘要內容");
        assert_eq!(*generator.prompts.borrow(), vec!["prompt"]);
    }

    #[tokio::test]
    async fn test_summarize_rejects_empty_response() {
        let generator = FakeGenerator::new(vec![Ok("   ")]);
        let err = summarize(&generator, "prompt").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("Google API 摘要生成失敗"));
        assert!(msg.contains("API 回應為空"));
    }

    #[tokio::test]
    async fn test_summarize_wraps_errors() {
        let generator = FakeGenerator::new(vec![Err("Gemini API returned 429")]);
        let err = summarize(&generator, "prompt").await.unwrap_err();
        assert!(format!("{err:#}").contains("Gemini API returned 429"));
    }
}
