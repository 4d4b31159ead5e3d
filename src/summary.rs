use std::collections::{BTreeMap, BTreeSet};
use comfy_table::{ContentArrangement, Table};
use crate::analyze::AnalysisResults;
use crate::mapper::RunPlan;

#[derive(Clone, Debug, Default)]
struct RunResults {
    merge_failed: BTreeSet<String>,
    threshold_exceeded: BTreeSet<String>,
    anomaly_detected: BTreeSet<String>,
}

// Collects per-run findings across the whole invocation and reports them
// once at the end, so a long batch does not have to be scrolled for the
// interesting parts.
#[derive(Debug, Default)]
pub struct ProcessingSummary {
    notes: BTreeMap<String, Vec<String>>,
    results: BTreeMap<String, RunResults>,
}

impl ProcessingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_missing_csvs(&mut self, plan: &RunPlan) {
        for (run_key, entries) in plan {
            if entries.iter().all(|(_, path)| path.is_none()) {
                self.notes
                    .entry(run_key.clone())
                    .or_default()
                    .push("No CSV files found.".to_string());
            } else {
                let missing: Vec<&str> = entries
                    .iter()
                    .filter(|(_, path)| path.is_none())
                    .map(|(name, _)| name.as_str())
                    .collect();
                if !missing.is_empty() {
                    self.notes
                        .entry(run_key.clone())
                        .or_default()
                        .push(format!("Some CSV files not found: {missing:?}"));
                }
            }
        }
    }

    // Runs that were processed get an entry even when everything was clean,
    // so the report can say so explicitly.
    pub fn record_run(
        &mut self,
        run_key: &str,
        merge_failed: &BTreeSet<String>,
        analysis: &AnalysisResults,
    ) {
        let entry = self.results.entry(run_key.to_string()).or_default();
        entry.merge_failed.extend(merge_failed.iter().cloned());
        entry.threshold_exceeded.extend(analysis.threshold_exceeded.iter().cloned());
        entry.anomaly_detected.extend(analysis.anomaly_detected.iter().cloned());
    }

    pub fn findings(&self) -> BTreeMap<String, Vec<String>> {
        let mut findings = self.notes.clone();
        for (run_key, results) in &self.results {
            let lines = findings.entry(run_key.clone()).or_default();
            if !results.threshold_exceeded.is_empty() {
                lines.push(format!(
                    "Exceeded threshold detected: {:?}",
                    as_sorted_list(&results.threshold_exceeded)
                ));
            }
            if !results.anomaly_detected.is_empty() {
                lines.push(format!(
                    "Anomaly value detected: {:?}",
                    as_sorted_list(&results.anomaly_detected)
                ));
            }
            if !results.merge_failed.is_empty() {
                lines.push(format!(
                    "Merge failed sheets: {:?}",
                    as_sorted_list(&results.merge_failed)
                ));
            }
        }
        findings
    }

    pub fn log_summaries(&self) {
        log::info!("Starting to log summary.");
        for (run_key, items) in self.findings() {
            log::info!("Summary for {run_key}:");
            if items.is_empty() {
                log::info!("No anomalies detected.");
            } else {
                for item in items {
                    log::warn!("{item}");
                }
            }
        }
        log::info!("Finished logging summary.");
    }

    pub fn print_table(&self) {
        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Run key", "Findings"]);
        for (run_key, items) in self.findings() {
            let cell = if items.is_empty() {
                "No anomalies detected.".to_string()
            } else {
                items.join("\n")
            };
            table.add_row(vec![run_key, cell]);
        }
        println!("{table}");
    }
}

fn as_sorted_list(set: &BTreeSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}
