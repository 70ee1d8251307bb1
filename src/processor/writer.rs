//! Excel table writer
//!
//! Writes a record set as one worksheet holding a header row and one text
//! row per record, covered by a named `TableStyleMedium2` table. Any previous
//! output at the same path is removed first.

use crate::constants::MIN_TABLE_ROWS;
use crate::error::Result;
use crate::models::CanonicalRecord;
use rust_xlsxwriter::{Table, TableColumn, TableStyle, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writer for one output workbook
#[derive(Debug, Clone)]
pub struct TableWriter {
    output_path: PathBuf,
}

impl TableWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write records in their kind's column order; returns the data row count
    pub fn write_records<R: CanonicalRecord>(&self, records: &[R]) -> Result<usize> {
        let header: Vec<String> = R::KIND.columns().iter().map(|c| c.to_string()).collect();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| record.values().into_iter().map(str::to_string).collect())
            .collect();
        self.write_table(R::KIND.sheet_name(), R::KIND.table_name(), &header, &rows)
    }

    /// Write a header and text rows as a named table
    pub fn write_table(
        &self,
        sheet_name: &str,
        table_name: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<usize> {
        self.remove_previous();
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, label) in header.iter().enumerate() {
            worksheet.write_string(0, col as u16, label)?;
        }
        for (index, row) in rows.iter().enumerate() {
            let row_number = index as u32 + 1;
            for (col, value) in row.iter().enumerate().take(header.len()) {
                if !value.is_empty() {
                    worksheet.write_string(row_number, col as u16, value)?;
                }
            }
        }

        let populated_rows = rows.len() as u32 + 1;
        if populated_rows >= MIN_TABLE_ROWS && !header.is_empty() {
            let columns: Vec<TableColumn> = header
                .iter()
                .map(|label| TableColumn::new().set_header(label))
                .collect();
            let table = Table::new()
                .set_name(table_name)
                .set_style(TableStyle::Medium2)
                .set_banded_rows(true)
                .set_columns(&columns);
            worksheet.add_table(0, 0, populated_rows - 1, header.len() as u16 - 1, &table)?;
            debug!("Table '{}' added to sheet '{}'", table_name, sheet_name);
        } else {
            warn!(
                "Not enough rows for table '{}' in {}",
                table_name,
                self.output_path.display()
            );
        }

        worksheet.autofit();
        workbook.save(&self.output_path)?;
        verify_output(&self.output_path);

        info!(
            "Wrote {} rows to {}",
            rows.len(),
            self.output_path.display()
        );
        Ok(rows.len())
    }

    fn remove_previous(&self) {
        if self.output_path.exists() {
            if let Err(e) = fs::remove_file(&self.output_path) {
                warn!(
                    "Could not remove previous output {}: {}",
                    self.output_path.display(),
                    e
                );
            }
        }
    }
}

/// Table column headers must be non-empty and unique. Blank labels become
/// `ColumnN`; repeats get a numeric suffix.
pub fn unique_headers(labels: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(labels.len());
    for (index, label) in labels.iter().enumerate() {
        let base = match label.trim() {
            "" => format!("Column{}", index + 1),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while seen.iter().any(|s| s.eq_ignore_ascii_case(&candidate)) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}

/// Whether a written file exists with content; warns otherwise
pub fn verify_output(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => true,
        Ok(_) => {
            warn!("Output file is empty: {}", path.display());
            false
        }
        Err(_) => {
            warn!("Output file missing: {}", path.display());
            false
        }
    }
}
