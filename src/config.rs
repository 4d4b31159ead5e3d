use std::path::{Path, PathBuf};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";
const DEFAULT_LOG_DIRECTORY: &str = "log_directory";
const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
const DEFAULT_ANOMALY_KEY: &str = "random_key";
const DEFAULT_EXCESS_RATIO_CEILING: f64 = 1.0;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    targets: Option<Vec<String>>,
    // Kept loose so a string or boolean in the YAML is rejected with the
    // same message as a missing key rather than a serde type error.
    processing_time_threshold_seconds: Option<serde_yaml::Value>,
    log_directory: Option<String>,
    output_directory: Option<String>,
    anomaly_key: Option<String>,
    excess_ratio_ceiling: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub targets: Vec<String>,
    pub threshold_seconds: i64,
    pub log_directory: PathBuf,
    pub output_directory: PathBuf,
    pub anomaly_key: String,
    pub excess_ratio_ceiling: f64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Configuration file {} not found.", path.display()))?;
        let raw: RawConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("Error parsing {}.", path.display()))?;
        log::info!("Configuration file {} loaded successfully.", path.display());

        let threshold_seconds = match raw
            .processing_time_threshold_seconds
            .as_ref()
            .and_then(serde_yaml::Value::as_i64)
        {
            Some(v) if v >= 1 => v,
            _ => bail!("Invalid value for 'processing_time_threshold_seconds' in config file."),
        };
        let excess_ratio_ceiling = raw.excess_ratio_ceiling.unwrap_or(DEFAULT_EXCESS_RATIO_CEILING);
        if !excess_ratio_ceiling.is_finite() || excess_ratio_ceiling <= 0.0 {
            bail!("Invalid value for 'excess_ratio_ceiling' in config file.");
        }

        Ok(Config {
            targets: raw.targets.unwrap_or_default(),
            threshold_seconds,
            log_directory: PathBuf::from(
                raw.log_directory.unwrap_or_else(|| DEFAULT_LOG_DIRECTORY.to_string()),
            ),
            output_directory: PathBuf::from(
                raw.output_directory.unwrap_or_else(|| DEFAULT_OUTPUT_DIRECTORY.to_string()),
            ),
            anomaly_key: raw.anomaly_key.unwrap_or_else(|| DEFAULT_ANOMALY_KEY.to_string()),
            excess_ratio_ceiling,
        })
    }
}
