use std::path::{Path, PathBuf};
use crate::paths;

// One workbook's worth of sheets: (sheet name, CSV path if the file exists).
pub type SheetEntries = Vec<(String, Option<PathBuf>)>;
// Run key (date or target fullname) to the sheets of its workbook.
pub type RunPlan = Vec<(String, SheetEntries)>;

pub fn by_date(dates: &[String], target_fullnames: &[String], log_directory: &Path) -> RunPlan {
    dates
        .iter()
        .map(|date| {
            let entries = target_fullnames
                .iter()
                .map(|target| (target.clone(), paths::csv_path(log_directory, target, date)))
                .collect();
            (date.clone(), entries)
        })
        .collect()
}

pub fn by_target(dates: &[String], target_fullnames: &[String], log_directory: &Path) -> RunPlan {
    target_fullnames
        .iter()
        .map(|target| {
            let entries = dates
                .iter()
                .map(|date| (date.clone(), paths::csv_path(log_directory, target, date)))
                .collect();
            (target.clone(), entries)
        })
        .collect()
}
