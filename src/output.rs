use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use eyre::{Result, WrapErr};
use log::debug;
use regex::Regex;

use crate::Variant;

const MAX_FILENAME_CHARS: usize = 100;
const SEPARATOR_WIDTH: usize = 80;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static RESERVED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Everything that goes into a saved summary file
#[derive(Debug, Clone)]
pub struct Report {
    pub video_id: String,
    pub title: Option<String>,
    pub model_name: String,
    pub variant: Variant,
    pub generated_at: DateTime<Local>,
    pub body: String,
}

/// Make a title safe to use as a file name
pub fn sanitize_filename(title: &str) -> String {
    let replaced = RESERVED.replace_all(title, "_");
    let collapsed = WHITESPACE.replace_all(&replaced, " ");
    let truncated: String = collapsed.trim().chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_end().to_string()
}

/// File name for a report, from the title when there is a usable one
pub fn output_filename(video_id: &str, title: Option<&str>, variant: Variant) -> String {
    let safe_title = title.map(sanitize_filename).filter(|t| !t.is_empty());
    match (safe_title, variant) {
        (Some(t), Variant::Transcript) => format!("{t}.txt"),
        (Some(t), Variant::MetadataOnly) => format!("{t}_無字幕版.txt"),
        (None, Variant::Transcript) => format!("summary_{video_id}_google.txt"),
        (None, Variant::MetadataOnly) => format!("summary_{video_id}_google_no_subtitle.txt"),
    }
}

/// Header block followed by the summary body
pub fn render_report(report: &Report) -> String {
    let heading = match report.variant {
        Variant::Transcript => "YouTube 影片摘要 (Google API)",
        Variant::MetadataOnly => "YouTube 影片摘要 (Google API 無字幕版)",
    };
    let title = report
        .title
        .clone()
        .unwrap_or_else(|| format!("Video {}", report.video_id));

    let mut out = String::new();
    out.push_str(&format!("{heading}\n"));
    out.push_str(&format!("影片標題：{title}\n"));
    out.push_str(&format!("影片 ID：{}\n", report.video_id));
    out.push_str(&format!("生成時間：{}\n", report.generated_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("使用模型：{}\n", report.model_name));
    if report.variant == Variant::MetadataOnly {
        out.push_str("摘要類型：無字幕分析\n");
    }
    out.push('\n');
    out.push_str(&"=".repeat(SEPARATOR_WIDTH));
    out.push_str("\n\n");
    out.push_str(&report.body);
    out
}

/// Write the report as BOM-prefixed UTF-8 into `dir`
pub fn save_report(dir: &Path, report: &Report) -> Result<PathBuf> {
    let filename = output_filename(&report.video_id, report.title.as_deref(), report.variant);
    let path = dir.join(filename);
    write_with_bom(&path, &render_report(report)).wrap_err("無法儲存摘要檔案")?;
    debug!("Report written to {}", path.display());
    Ok(path)
}

fn write_with_bom(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}
