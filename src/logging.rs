use std::io::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use crate::paths;

pub const DEFAULT_LOG_DIR: &str = "log";
pub const LOG_FILES_KEPT: usize = 7;

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug)]
pub struct LogOptions {
    // None keeps whatever RUST_LOG says, with info as the fallback.
    pub level: Option<log::LevelFilter>,
    pub format: LogFormat,
    pub path: Option<PathBuf>,
}

// Every record goes to stdout and to the log file.
struct TeeWriter {
    stdout: io::Stdout,
    file: std::fs::File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        self.file.flush()
    }
}

pub fn default_log_path(today: chrono::NaiveDate) -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR).join(format!("logsheet_{}.log", today.format("%Y%m%d")))
}

pub fn init(options: &LogOptions) -> Result<()> {
    let (path, prune) = match options.path.clone() {
        Some(path) => (path, false),
        None => (default_log_path(chrono::Local::now().date_naive()), true),
    };
    paths::ensure_parent_dir(&path)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    if prune {
        prune_old_logs(Path::new(DEFAULT_LOG_DIR), LOG_FILES_KEPT);
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = options.level {
        builder.filter_level(level);
    }
    match options.format {
        LogFormat::Text => {
            builder.format(|buf, record| {
                let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                writeln!(buf, "{} - {} - {} - {}", ts, record.level(), record.target(), record.args())
            });
        }
        LogFormat::Json => {
            builder.format(|buf, record| {
                let obj = serde_json::json!({
                    "ts": chrono::Local::now().to_rfc3339(),
                    "level": record.level().to_string(),
                    "target": record.target(),
                    "msg": record.args().to_string(),
                });
                writeln!(buf, "{}", obj)
            });
        }
    }
    builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { stdout: io::stdout(), file })));
    builder.try_init().context("Failed to install logger")?;
    Ok(())
}

// Date-stamped files stand in for rotation: one file per day, the newest
// seven kept.
pub fn prune_old_logs(dir: &Path, keep: usize) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut logs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.starts_with("logsheet_") && name.ends_with(".log")
        })
        .collect();
    logs.sort();
    while logs.len() > keep {
        let oldest = logs.remove(0);
        let _ = std::fs::remove_file(&oldest);
    }
}
