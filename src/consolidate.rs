use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use anyhow::{Result, bail};
use crate::workbook::{SENTINEL_SHEET, Sheet, TabColor, Workbook};

pub const NO_CSV_PLACEHOLDER: &str = "No CSV file found.";

#[derive(Debug, Default)]
pub struct Consolidator {
    merge_failed: BTreeSet<String>,
    show_progress: bool,
}

impl Consolidator {
    pub fn new(show_progress: bool) -> Self {
        Consolidator { merge_failed: BTreeSet::new(), show_progress }
    }

    // Merges every entry into the workbook. A sentinel sheet guards the
    // merge so the workbook is never left without sheets; it is dropped as
    // soon as a real sheet exists.
    pub fn consolidate(&mut self, workbook: &mut Workbook, entries: &[(String, Option<PathBuf>)]) {
        log::info!("Starting to merge.");
        create_sentinel_sheet(workbook);
        self.create_sheets(workbook, entries);
        remove_sentinel_sheet(workbook);
        log::info!("Merging completed.");
    }

    fn create_sheets(&mut self, workbook: &mut Workbook, entries: &[(String, Option<PathBuf>)]) {
        let total = entries.len();
        let pb = if self.show_progress { Some(indicatif::ProgressBar::new_spinner()) } else { None };
        for (number, (sheet_name, csv_path)) in entries.iter().enumerate() {
            if let Some(ref pb) = pb { pb.set_message(format!("Merging {sheet_name}")); pb.tick(); }
            match csv_path {
                Some(path) => self.create_sheet_from_csv(workbook, sheet_name, path),
                None => create_no_csv_sheet(workbook, sheet_name),
            }
            log::info!("Added sheet: {}. ({}/{})", sheet_name, number + 1, total);
        }
        if let Some(pb) = pb { pb.finish_and_clear(); }
    }

    fn create_sheet_from_csv(&mut self, workbook: &mut Workbook, sheet_name: &str, csv_path: &Path) {
        match read_csv_rows(csv_path) {
            Ok(rows) => workbook.add_sheet(Sheet::new(sheet_name, rows)),
            Err(e) => {
                log::error!("Failed to read CSV file at {}: {}", csv_path.display(), e);
                self.merge_failed.insert(sheet_name.to_string());
            }
        }
    }

    pub fn merge_failed(&self) -> &BTreeSet<String> {
        &self.merge_failed
    }
}

fn create_sentinel_sheet(workbook: &mut Workbook) {
    workbook.add_sheet(Sheet::new(SENTINEL_SHEET, vec![vec![SENTINEL_SHEET.to_string()]]));
}

// When every merge failed the sentinel stays, keeping the workbook valid.
fn remove_sentinel_sheet(workbook: &mut Workbook) {
    if workbook.len() > 1 {
        workbook.remove_sheet(SENTINEL_SHEET);
    }
}

fn create_no_csv_sheet(workbook: &mut Workbook, sheet_name: &str) {
    let mut sheet = Sheet::new(sheet_name, vec![vec![NO_CSV_PLACEHOLDER.to_string()]]);
    sheet.tab_color = Some(TabColor::Gray);
    workbook.add_sheet(sheet);
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    if rows.is_empty() {
        bail!("no columns to parse from file");
    }
    Ok(rows)
}
