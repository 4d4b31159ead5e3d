use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

// Per-target CSV drops follow a fixed layout: <log_dir>/<target>/test_<YYYYMMDD>.csv
pub fn csv_path(log_directory: &Path, target_fullname: &str, date: &str) -> Option<PathBuf> {
    let path = log_directory.join(target_fullname).join(format!("test_{date}.csv"));
    if path.is_file() { Some(path) } else { None }
}

pub fn date_workbook_path(output_directory: &Path, date: &str, target_prefix: &str) -> PathBuf {
    output_directory.join(date).join(format!("{date}_{target_prefix}.xlsx"))
}

pub fn target_workbook_path(output_directory: &Path, target_fullname: &str) -> PathBuf {
    output_directory.join(format!("{target_fullname}.xlsx"))
}

pub fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(dir) = file_path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}
