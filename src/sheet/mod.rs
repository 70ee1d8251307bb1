//! Worksheet access
//!
//! Reads workbooks through calamine into [`SheetData`]: a grid of typed
//! [`CellValue`]s addressed with 1-based absolute coordinates, plus the
//! hyperlink target attached to each cell. Targets come from the sheet's
//! relationship part (xlsx only) and from `HYPERLINK("...")` formulas.

pub mod hyperlinks;

use crate::error::{Result, XaurumError};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static HYPERLINK_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*=?\s*HYPERLINK\(\s*"([^"]+)""#).expect("Invalid HYPERLINK regex")
});

/// One untyped spreadsheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Error(String),
}

impl CellValue {
    /// Display form: trimmed text, integral numbers without a fraction,
    /// midnight dates as `YYYY-MM-DD`
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(number) => format_number(*number),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Date(value) if value.time() == NaiveTime::MIN => {
                value.format("%Y-%m-%d").to_string()
            }
            CellValue::Date(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Error(code) => code.clone(),
        }
    }

    /// Empty cell or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Int(value) => CellValue::Number(*value as f64),
            Data::Float(value) => CellValue::Number(*value),
            Data::Bool(value) => CellValue::Bool(*value),
            Data::DateTime(value) => value
                .as_datetime()
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Number(value.as_f64())),
            Data::DateTimeIso(text) => parse_iso_datetime(text)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::Text(text.clone())),
            Data::DurationIso(text) => CellValue::Text(text.clone()),
            Data::Error(error) => CellValue::Error(error.to_string()),
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// A worksheet loaded into memory
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    name: String,
    rows: Vec<Vec<CellValue>>,
    hyperlinks: HashMap<(u32, u32), String>,
}

impl SheetData {
    /// Build a sheet from rows starting at A1
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
            hyperlinks: HashMap::new(),
        }
    }

    /// Build a sheet from a calamine range, honouring its start offset
    pub fn from_range(name: impl Into<String>, range: &Range<Data>) -> Self {
        let mut sheet = Self::from_rows(name, Vec::new());
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        for (row, col, data) in range.used_cells() {
            let row = row_offset as usize + row;
            let col = col_offset as usize + col;
            sheet.set(row, col, CellValue::from(data));
        }
        sheet
    }

    fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, CellValue::default);
        }
        cells[col] = value;
    }

    /// Attach a hyperlink target to a 1-based cell
    pub fn with_hyperlink(mut self, row: u32, col: u32, target: impl Into<String>) -> Self {
        self.hyperlinks.insert((row, col), target.into());
        self
    }

    /// Merge targets, keeping those already present
    pub fn merge_hyperlinks(&mut self, links: HashMap<(u32, u32), String>) {
        for (cell, target) in links {
            self.hyperlinks.entry(cell).or_insert(target);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell at a 1-based position; out of range is [`CellValue::Empty`]
    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|cells| cells.get(col as usize - 1))
            .unwrap_or(&EMPTY)
    }

    /// Hyperlink target at a 1-based position
    pub fn hyperlink(&self, row: u32, col: u32) -> Option<&str> {
        self.hyperlinks.get(&(row, col)).map(String::as_str)
    }

    pub fn hyperlink_count(&self) -> usize {
        self.hyperlinks.len()
    }

    /// Last populated row (1-based), 0 for an empty sheet
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest populated column (1-based)
    pub fn max_column(&self) -> u32 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u32
    }

    /// Display text of every cell in a 1-based row, up to the widest column
    pub fn row_text(&self, row: u32) -> Vec<String> {
        (1..=self.max_column())
            .map(|col| self.cell(row, col).as_text())
            .collect()
    }
}

/// An open workbook in any format calamine reads
pub struct SpreadsheetFile {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl SpreadsheetFile {
    pub fn open(path: &Path) -> Result<Self> {
        let workbook = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Load the first worksheet
    pub fn first_sheet(&mut self) -> Result<SheetData> {
        let name = self
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| XaurumError::NoWorksheet {
                path: self.path.clone(),
            })?;
        self.read_sheet(&name)
    }

    /// Load the first worksheet, in workbook order, whose trimmed lowercase
    /// name is one of `candidates`
    pub fn find_sheet(&mut self, candidates: &[&str]) -> Result<Option<SheetData>> {
        let found = self
            .sheet_names()
            .into_iter()
            .find(|name| candidates.contains(&name.trim().to_lowercase().as_str()));
        match found {
            Some(name) => self.read_sheet(&name).map(Some),
            None => Ok(None),
        }
    }

    /// Load a worksheet with its hyperlink targets
    pub fn read_sheet(&mut self, name: &str) -> Result<SheetData> {
        let range = self.workbook.worksheet_range(name)?;
        let mut sheet = SheetData::from_range(name, &range);

        if hyperlinks::is_zip_container(&self.path) {
            let extent = (sheet.max_row(), sheet.max_column());
            match hyperlinks::read_sheet_hyperlinks(&self.path, name, extent) {
                Ok(links) => sheet.merge_hyperlinks(links),
                Err(e) => debug!("No relationship hyperlinks for sheet '{}': {}", name, e),
            }
        }

        match self.workbook.worksheet_formula(name) {
            Ok(formulas) => sheet.merge_hyperlinks(formula_hyperlinks(&formulas)),
            Err(e) => debug!("No formulas read for sheet '{}': {}", name, e),
        }

        debug!(
            "Loaded sheet '{}': {} rows x {} columns, {} hyperlinks",
            name,
            sheet.max_row(),
            sheet.max_column(),
            sheet.hyperlink_count()
        );
        Ok(sheet)
    }
}

/// Targets of `HYPERLINK("url", ...)` formulas, keyed by 1-based cell
fn formula_hyperlinks(formulas: &Range<String>) -> HashMap<(u32, u32), String> {
    let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
    formulas
        .used_cells()
        .filter_map(|(row, col, formula)| {
            let target = HYPERLINK_FORMULA.captures(formula)?.get(1)?.as_str().to_string();
            Some((
                (row_offset + row as u32 + 1, col_offset + col as u32 + 1),
                target,
            ))
        })
        .collect()
}
