use std::collections::HashMap;
use std::path::Path;
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, XlsxError};

pub const SENTINEL_SHEET: &str = "SENTINEL_SHEET";
pub const YELLOW: u32 = 0xFFFF7F;
pub const GRAY: u32 = 0x7F7F7F;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabColor {
    Yellow,
    Gray,
}

impl TabColor {
    pub fn rgb(self) -> u32 {
        match self {
            TabColor::Yellow => YELLOW,
            TabColor::Gray => GRAY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
    pub fills: HashMap<(u32, u16), u32>,
    pub tab_color: Option<TabColor>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Sheet { name: name.into(), rows, fills: HashMap::new(), tab_color: None }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub fn fill(&mut self, row: u32, col: u16, rgb: u32) {
        self.fills.insert((row, col), rgb);
    }

    pub fn fill_at(&self, row: u32, col: u16) -> Option<u32> {
        self.fills.get(&(row, col)).copied()
    }
}

// Sheets stay in memory until save so they can still be recolored and
// reordered after the merge; the xlsx is rendered in one pass at the end.
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name)?;
        Some(self.sheets.remove(idx))
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    // Vec::sort_by_key is stable, so sheets with equal keys keep their
    // insertion order.
    pub fn sort_sheets_by_key<K: Ord, F: FnMut(&Sheet) -> K>(&mut self, key: F) {
        self.sheets.sort_by_key(key);
    }

    pub fn save(&self, path: &Path) -> Result<(), XlsxError> {
        self.render()?.save(path)
    }

    pub fn save_to_buffer(&self) -> Result<Vec<u8>, XlsxError> {
        self.render()?.save_to_buffer()
    }

    fn render(&self) -> Result<XlsxWorkbook, XlsxError> {
        let mut xlsx = XlsxWorkbook::new();
        for sheet in &self.sheets {
            let ws = xlsx.add_worksheet();
            ws.set_name(sheet.name.as_str())?;
            if let Some(tab) = sheet.tab_color {
                ws.set_tab_color(Color::RGB(tab.rgb()));
            }
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    let row_idx = r as u32;
                    let col_idx = c as u16;
                    if value.is_empty() {
                        continue;
                    }
                    match sheet.fill_at(row_idx, col_idx) {
                        Some(rgb) => {
                            let format = Format::new().set_background_color(Color::RGB(rgb));
                            match numeric(value) {
                                Some(n) => {
                                    ws.write_number_with_format(row_idx, col_idx, n, &format)?
                                }
                                None => ws.write_string_with_format(
                                    row_idx,
                                    col_idx,
                                    value.as_str(),
                                    &format,
                                )?,
                            };
                        }
                        None => {
                            match numeric(value) {
                                Some(n) => ws.write_number(row_idx, col_idx, n)?,
                                None => ws.write_string(row_idx, col_idx, value.as_str())?,
                            };
                        }
                    }
                }
            }
        }
        Ok(xlsx)
    }
}

// Cells that parse as finite numbers are written as numbers so spreadsheet
// formulas keep working on the consolidated data.
fn numeric(value: &str) -> Option<f64> {
    let n: f64 = value.trim().parse().ok()?;
    if n.is_finite() { Some(n) } else { None }
}
