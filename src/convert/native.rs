//! In-process conversion: calamine reads the legacy workbook and
//! rust_xlsxwriter writes every sheet back out cell by cell.

use super::ConversionStrategy;
use crate::constants::DATE_CELL_FORMAT;
use crate::error::{Result, XaurumError};
use crate::sheet::CellValue;
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConversion;

impl ConversionStrategy for NativeConversion {
    fn name(&self) -> &str {
        "native"
    }

    fn convert(&self, source: &Path, target: &Path) -> Result<()> {
        let mut input = open_workbook_auto(source)?;
        let sheet_names = input.sheet_names();
        if sheet_names.is_empty() {
            return Err(XaurumError::NoWorksheet {
                path: source.to_path_buf(),
            });
        }

        let date_format = Format::new().set_num_format(DATE_CELL_FORMAT);
        let mut output = Workbook::new();
        let mut skipped = 0usize;

        for name in &sheet_names {
            let range = input.worksheet_range(name)?;
            let worksheet = output.add_worksheet();
            worksheet.set_name(name)?;

            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
            for (row, col, data) in range.used_cells() {
                let row = row_offset + row as u32;
                let Ok(col) = u16::try_from(col_offset as usize + col) else {
                    skipped += 1;
                    continue;
                };
                if let Err(e) = write_cell(worksheet, row, col, data, &date_format) {
                    debug!("Skipping cell ({}, {}) in '{}': {}", row + 1, col + 1, name, e);
                    skipped += 1;
                }
            }
        }

        output.save(target)?;
        info!(
            "Native conversion wrote {} sheet(s) to {}",
            sheet_names.len(),
            target.display()
        );
        if skipped > 0 {
            debug!("{} cell(s) could not be converted and were left empty", skipped);
        }
        Ok(())
    }
}

/// Copy one cell, keeping dates as dates
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    data: &Data,
    date_format: &Format,
) -> std::result::Result<(), XlsxError> {
    match CellValue::from(data) {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet.write_string(row, col, text)?;
        }
        CellValue::Number(number) => {
            worksheet.write_number(row, col, number)?;
        }
        CellValue::Bool(value) => {
            worksheet.write_boolean(row, col, value)?;
        }
        CellValue::Date(value) => {
            worksheet.write_datetime_with_format(row, col, &value, date_format)?;
        }
        CellValue::Error(code) => {
            worksheet.write_string(row, col, code)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SpreadsheetFile;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_copies_every_sheet_with_typed_cells() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.xlsx");
        let target = temp_dir.path().join("copy.xlsx");

        let expiry = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Certificates").unwrap();
        first.write_string(0, 0, "Naam").unwrap();
        first.write_string(1, 0, "Jan").unwrap();
        first.write_number(1, 1, 12345).unwrap();
        first
            .write_datetime_with_format(1, 2, &expiry, &Format::new().set_num_format("dd/mm/yyyy"))
            .unwrap();
        workbook.add_worksheet().set_name("Second").unwrap();
        workbook.save(&source).unwrap();

        NativeConversion.convert(&source, &target).unwrap();

        let mut file = SpreadsheetFile::open(&target).unwrap();
        assert_eq!(file.sheet_names(), vec!["Certificates", "Second"]);
        let sheet = file.first_sheet().unwrap();
        assert_eq!(sheet.cell(2, 1).as_text(), "Jan");
        assert_eq!(sheet.cell(2, 2).as_text(), "12345");
        assert_eq!(sheet.cell(2, 3), &CellValue::Date(expiry));
    }

    #[test]
    fn test_unreadable_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("broken.xls");
        std::fs::write(&source, b"not a workbook").unwrap();

        let result = NativeConversion.convert(&source, &temp_dir.path().join("broken.xlsx"));
        assert!(matches!(result, Err(XaurumError::Spreadsheet(_))));
    }
}
