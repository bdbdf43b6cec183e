use clap::Parser;
use std::path::PathBuf;

use crate::config::{API_KEY_ENV, DEFAULT_LANGUAGE};
use crate::logging::log_path;

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "YouTube 影片摘要生成器 (Google API)",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube 影片網址或影片 ID
    pub video_url: String,

    /// 字幕語言偏好 (預設: zh-TW)
    #[arg(long)]
    pub language: Option<String>,

    /// 摘要檔案輸出目錄 (預設: 目前目錄)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 摘要使用的 Gemini 模型 (預設: gemini-2.0-flash)
    #[arg(long)]
    pub model: Option<String>,

    /// 顯示設定檔路徑與實際使用的設定
    #[arg(short, long)]
    pub verbose: bool,
}

/// Usage examples, credential status and log location for `--help`
pub fn build_after_help(bin: &str) -> String {
    let key_line = if std::env::var(API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        format!("  \x1b[32m✅\x1b[0m {API_KEY_ENV}")
    } else {
        format!("  \x1b[31m❌\x1b[0m {API_KEY_ENV}  (未設定: Google AI Studio API Key)")
    };

    format!(
        "\n使用範例：\n  {bin} dQw4w9WgXcQ\n  {bin} \"https://www.youtube.com/watch?v=dQw4w9WgXcQ\"\n  \
         {bin} dQw4w9WgXcQ --language {DEFAULT_LANGUAGE}\n\n環境變數：\n{key_line}\n\nLogs are written to: {}",
        log_path().display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positional_and_language() {
        let cli = Cli::parse_from(["ytsum", "https://youtu.be/dQw4w9WgXcQ", "--language", "en"]);
        assert_eq!(cli.video_url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(cli.language.as_deref(), Some("en"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_missing_video_url_is_error() {
        assert!(Cli::try_parse_from(["ytsum"]).is_err());
    }

    #[test]
    fn test_after_help_mentions_credential() {
        let help = build_after_help("ytsum-meta");
        assert!(help.contains("ytsum-meta dQw4w9WgXcQ"));
        assert!(help.contains(API_KEY_ENV));
    }
}
