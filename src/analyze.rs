use std::collections::BTreeSet;
use serde_json::Value;
use crate::workbook::{Sheet, TabColor, Workbook, YELLOW};

// Consolidated sheets share a fixed column layout; analysis only ever looks
// at these two columns.
pub const PROCESSING_TIME_COLUMN: usize = 2;
pub const ALERT_DETAIL_COLUMN: usize = 3;
const HEADER_ROWS: usize = 1;
const MAX_GREEN: f64 = 255.0;

#[derive(Clone, Debug, Default)]
pub struct AnalysisResults {
    pub threshold_exceeded: BTreeSet<String>,
    pub anomaly_detected: BTreeSet<String>,
}

pub struct Analyzer {
    threshold_seconds: i64,
    anomaly_key: String,
    excess_ratio_ceiling: f64,
    results: AnalysisResults,
}

impl Analyzer {
    pub fn new(threshold_seconds: i64, anomaly_key: &str, excess_ratio_ceiling: f64) -> Self {
        Analyzer {
            threshold_seconds,
            anomaly_key: anomaly_key.to_string(),
            excess_ratio_ceiling,
            results: AnalysisResults::default(),
        }
    }

    pub fn highlight_workbook(&mut self, workbook: &mut Workbook) {
        log::info!("Starting to highlight.");
        let total = workbook.len();
        for (number, sheet) in workbook.sheets_mut().iter_mut().enumerate() {
            self.highlight_sheet(sheet);
            log::info!("Analyzed sheet: {}. ({}/{})", sheet.name, number + 1, total);
        }
        log::info!("Highlighting completed.");
    }

    fn highlight_sheet(&mut self, sheet: &mut Sheet) {
        let mut highlighted = false;
        for row_idx in HEADER_ROWS..sheet.rows.len() {
            if self.check_processing_time(sheet, row_idx) {
                self.results.threshold_exceeded.insert(sheet.name.clone());
                highlighted = true;
            }
            if self.check_alert_detail(sheet, row_idx) {
                self.results.anomaly_detected.insert(sheet.name.clone());
                highlighted = true;
            }
        }
        // Yellow marks findings and outranks the gray used for placeholders.
        if highlighted {
            sheet.tab_color = Some(TabColor::Yellow);
            self.log_detected_anomalies(&sheet.name);
        }
    }

    fn check_processing_time(&self, sheet: &mut Sheet, row_idx: usize) -> bool {
        let value = match sheet.cell(row_idx, PROCESSING_TIME_COLUMN) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => return false,
        };
        let seconds = match value.trim_end_matches('s').trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Invalid processing time value: {value}");
                return false;
            }
        };
        if seconds < self.threshold_seconds {
            return false;
        }
        let rgb = self.excess_color(seconds);
        sheet.fill(row_idx as u32, PROCESSING_TIME_COLUMN as u16, rgb);
        true
    }

    // Gradient from 0xFFFF7F at the threshold down to 0xFF7F7F at or beyond
    // the excess ceiling; only the green channel moves.
    fn excess_color(&self, seconds: i64) -> u32 {
        let excess_ratio =
            (seconds - self.threshold_seconds) as f64 / self.threshold_seconds as f64;
        let clamped = excess_ratio.clamp(0.0, self.excess_ratio_ceiling);
        let green = (MAX_GREEN - (MAX_GREEN / 2.0) * clamped) as i64;
        let green = green.clamp(0, 255) as u32;
        0xFF0000 | (green << 8) | 0x7F
    }

    fn check_alert_detail(&self, sheet: &mut Sheet, row_idx: usize) -> bool {
        let value = match sheet.cell(row_idx, ALERT_DETAIL_COLUMN) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => return false,
        };
        let parsed: Value = match serde_json::from_str(&value) {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Invalid JSON format found: {value}");
                return false;
            }
        };
        let flagged = match &parsed {
            Value::Array(items) => items
                .iter()
                .any(|item| item.get(self.anomaly_key.as_str()).and_then(Value::as_bool) == Some(true)),
            Value::Object(map) => {
                map.get(self.anomaly_key.as_str()).and_then(Value::as_bool) == Some(true)
            }
            _ => false,
        };
        if flagged {
            sheet.fill(row_idx as u32, ALERT_DETAIL_COLUMN as u16, YELLOW);
        }
        flagged
    }

    fn log_detected_anomalies(&self, sheet_name: &str) {
        if self.results.threshold_exceeded.contains(sheet_name) {
            log::warn!("Processing time threshold exceeded: {sheet_name}");
        }
        if self.results.anomaly_detected.contains(sheet_name) {
            log::warn!("Anomaly value detected: {sheet_name}");
        }
    }

    // Stable partition: yellow sheets first, untouched sheets next, gray
    // placeholders last.
    pub fn reorder_sheets_by_color(&self, workbook: &mut Workbook) {
        log::info!("Starting to reorder.");
        let total = workbook.len();
        workbook.sort_sheets_by_key(tab_color_rank);
        for (number, name) in workbook.sheet_names().iter().enumerate() {
            log::info!("Reordered sheet: {}. ({}/{})", name, number + 1, total);
        }
        log::info!("Reordering completed.");
    }

    pub fn results(&self) -> &AnalysisResults {
        &self.results
    }
}

fn tab_color_rank(sheet: &Sheet) -> u8 {
    match sheet.tab_color {
        Some(TabColor::Yellow) => 0,
        None => 1,
        Some(TabColor::Gray) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_sheet(name: &str, rows: &[(&str, &str)]) -> Sheet {
        let mut all = vec![vec![
            "Date_A".to_string(),
            "Date_B".to_string(),
            "Processing_Time".to_string(),
            "JSON".to_string(),
        ]];
        for (time, json) in rows {
            all.push(vec![
                "1988-02-09 00:00:00".to_string(),
                "1988-02-09 00:00:10".to_string(),
                time.to_string(),
                json.to_string(),
            ]);
        }
        Sheet::new(name, all)
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(4, "random_key", 1.0)
    }

    #[test]
    fn below_threshold_stays_unhighlighted() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("clean", &[("3s", "[]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("clean").unwrap();
        assert_eq!(sheet.fill_at(1, 2), None);
        assert_eq!(sheet.tab_color, None);
        assert!(analyzer.results().threshold_exceeded.is_empty());
    }

    #[test]
    fn threshold_is_inclusive_and_starts_at_full_green() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("edge", &[("4s", "[]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("edge").unwrap();
        assert_eq!(sheet.fill_at(1, 2), Some(0xFFFF7F));
        assert_eq!(sheet.tab_color, Some(TabColor::Yellow));
        assert!(analyzer.results().threshold_exceeded.contains("edge"));
    }

    #[test]
    fn gradient_darkens_with_excess() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("grad", &[("5s", "[]"), ("8s", "[]"), ("80s", "[]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("grad").unwrap();
        assert_eq!(sheet.fill_at(1, 2), Some(0xFFDF7F));
        assert_eq!(sheet.fill_at(2, 2), Some(0xFF7F7F));
        assert_eq!(sheet.fill_at(3, 2), Some(0xFF7F7F));
    }

    #[test]
    fn higher_ceiling_stretches_the_gradient() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("wide", &[("10s", "[]"), ("12s", "[]")]));
        let mut analyzer = Analyzer::new(4, "random_key", 2.0);
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("wide").unwrap();
        assert_eq!(sheet.fill_at(1, 2), Some(0xFF3F7F));
        assert_eq!(sheet.fill_at(2, 2), Some(0xFF007F));
    }

    #[test]
    fn unparseable_processing_time_is_skipped() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("odd", &[("fast", "[]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("odd").unwrap();
        assert_eq!(sheet.fill_at(1, 2), None);
        assert_eq!(sheet.tab_color, None);
    }

    #[test]
    fn anomaly_in_array_fills_yellow() {
        let mut workbook = Workbook::new();
        workbook
            .add_sheet(data_sheet("anom", &[("1s", "[{\"other\": 1}, {\"random_key\": true}]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("anom").unwrap();
        assert_eq!(sheet.fill_at(1, 3), Some(YELLOW));
        assert_eq!(sheet.tab_color, Some(TabColor::Yellow));
        assert!(analyzer.results().anomaly_detected.contains("anom"));
    }

    #[test]
    fn anomaly_key_must_be_literally_true() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet(
            "nope",
            &[("1s", "[{\"random_key\": false}]"), ("1s", "[{\"random_key\": \"true\"}]")],
        ));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("nope").unwrap();
        assert_eq!(sheet.fill_at(1, 3), None);
        assert_eq!(sheet.fill_at(2, 3), None);
    }

    #[test]
    fn top_level_object_is_checked_directly() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("obj", &[("1s", "{\"random_key\": true}")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        assert!(analyzer.results().anomaly_detected.contains("obj"));
    }

    #[test]
    fn invalid_json_is_skipped_without_highlight() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("bad", &[("1s", "{not json")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("bad").unwrap();
        assert_eq!(sheet.fill_at(1, 3), None);
        assert_eq!(sheet.tab_color, None);
        assert!(analyzer.results().anomaly_detected.is_empty());
    }

    #[test]
    fn custom_anomaly_key_is_honored() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("custom", &[("1s", "[{\"odd_flag\": true}]")]));
        let mut analyzer = Analyzer::new(4, "odd_flag", 1.0);
        analyzer.highlight_workbook(&mut workbook);
        assert!(analyzer.results().anomaly_detected.contains("custom"));
    }

    #[test]
    fn placeholder_and_short_rows_are_ignored() {
        let mut workbook = Workbook::new();
        let mut placeholder = Sheet::new("ph", vec![vec!["No CSV file found.".to_string()]]);
        placeholder.tab_color = Some(TabColor::Gray);
        workbook.add_sheet(placeholder);
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("ph").unwrap();
        assert_eq!(sheet.tab_color, Some(TabColor::Gray));
        assert!(sheet.fills.is_empty());
    }

    #[test]
    fn reorder_partitions_yellow_plain_gray() {
        let mut workbook = Workbook::new();
        let mut gray1 = Sheet::new("gray1", vec![]);
        gray1.tab_color = Some(TabColor::Gray);
        workbook.add_sheet(gray1);
        workbook.add_sheet(Sheet::new("plain1", vec![]));
        let mut yellow1 = Sheet::new("yellow1", vec![]);
        yellow1.tab_color = Some(TabColor::Yellow);
        workbook.add_sheet(yellow1);
        let mut gray2 = Sheet::new("gray2", vec![]);
        gray2.tab_color = Some(TabColor::Gray);
        workbook.add_sheet(gray2);
        workbook.add_sheet(Sheet::new("plain2", vec![]));
        let analyzer = analyzer();
        analyzer.reorder_sheets_by_color(&mut workbook);
        assert_eq!(
            workbook.sheet_names(),
            vec!["yellow1", "plain1", "plain2", "gray1", "gray2"]
        );
    }

    #[test]
    fn both_checks_can_fire_on_one_row() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(data_sheet("both", &[("9s", "[{\"random_key\": true}]")]));
        let mut analyzer = analyzer();
        analyzer.highlight_workbook(&mut workbook);
        let sheet = workbook.sheet("both").unwrap();
        assert_eq!(sheet.fill_at(1, 2), Some(0xFF7F7F));
        assert_eq!(sheet.fill_at(1, 3), Some(YELLOW));
        assert!(analyzer.results().threshold_exceeded.contains("both"));
        assert!(analyzer.results().anomaly_detected.contains("both"));
    }
}
