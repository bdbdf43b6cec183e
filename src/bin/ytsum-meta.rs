use std::process::ExitCode;

use eyre::Result;
use log::debug;

use ytsum::cli::{Cli, build_after_help};
use ytsum::config::{Config, Settings, api_key, config_path};
use ytsum::pipeline::Pipeline;

const NOTE: &str = "\n注意：\n  此版本不需要字幕即可生成摘要，會基於影片標題、描述和基本資訊進行分析。\n  \
如果影片有字幕，會優先使用字幕內容；如果沒有字幕，會基於其他資訊進行合理推測。";

async fn run() -> Result<()> {
    ytsum::logging::setup_logging()?;

    let cmd = <Cli as clap::CommandFactory>::command()
        .name("ytsum-meta")
        .about("YouTube 影片摘要生成器 (Google API 無字幕版本)")
        .after_help(format!("{}\n{NOTE}", build_after_help("ytsum-meta")));
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    let config = Config::load().unwrap_or_default();
    let settings = Settings::resolve(&cli, config);

    if cli.verbose {
        let path = config_path();
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
        eprintln!("Settings: {settings:?}");
    }

    let key = api_key()?;

    let video_id = ytsum::extract_video_id(&cli.video_url)
        .ok_or_else(|| eyre::eyre!("無法從網址中提取影片 ID"))?;
    debug!("Resolved {} to {video_id}", cli.video_url);

    let pipeline = Pipeline::connect(&settings, &key);
    let summary = pipeline.summarize_metadata_only(&video_id).await?;
    let report = pipeline.report(summary);
    let path = ytsum::output::save_report(&settings.output_dir, &report)?;

    println!("\n摘要已儲存至：{}", path.display());
    println!("\n摘要內容：");
    println!("{}", "=".repeat(50));
    println!("{}", report.body);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("錯誤：{e:#}");
            ExitCode::from(1)
        }
    }
}
