use std::collections::HashSet;
use std::path::Path;
use anyhow::{Result, bail};
use walkdir::WalkDir;
use crate::config::Config;

// Prefixes come from the CLI as a comma-separated list, falling back to the
// config file. An empty resolved set is a configuration error.
pub fn resolve_prefixes(cli: Option<&str>, config: &Config) -> Result<Vec<String>> {
    let prefixes: Vec<String> = match cli {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => config
            .targets
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    };
    if prefixes.is_empty() {
        bail!("No target prefixes given: pass a comma-separated list or set 'targets' in the config file.");
    }
    Ok(prefixes)
}

// Expands each prefix to the target folders actually present under the log
// directory. Folders are matched in sorted order and deduplicated when
// prefixes overlap; a prefix that matches nothing is fatal.
pub fn expand_prefixes(log_directory: &Path, prefixes: &[String]) -> Result<Vec<String>> {
    if !log_directory.is_dir() {
        bail!("Log directory {} not found.", log_directory.display());
    }
    let mut folders: Vec<String> = WalkDir::new(log_directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    folders.sort();

    let mut fullnames = Vec::new();
    let mut seen = HashSet::new();
    for prefix in prefixes {
        let matched: Vec<&String> =
            folders.iter().filter(|f| f.starts_with(prefix.as_str())).collect();
        if matched.is_empty() {
            bail!("No folder starting with target prefix '{prefix}' was found in the log directory.");
        }
        for name in matched {
            if seen.insert(name.clone()) {
                fullnames.push(name.clone());
            }
        }
    }
    Ok(fullnames)
}
