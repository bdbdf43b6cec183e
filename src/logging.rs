use std::path::PathBuf;

use eyre::Result;
use log::info;

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytsum")
        .join("logs")
}

pub fn log_path() -> PathBuf {
    log_dir().join("ytsum.log")
}

/// Send `RUST_LOG`-filtered logs to the log file, keeping stdout for progress
pub fn setup_logging() -> Result<()> {
    std::fs::create_dir_all(log_dir())?;
    let log_file = log_path();

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}
