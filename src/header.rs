//! Header resolution.
//!
//! Maps a worksheet's header row onto logical fields through ordered synonym
//! lists, finds headerless download-link columns and picks the worksheet
//! whose headers best match a dataset.

use crate::error::{Result, XaurumError};
use crate::normalize::extract_hyperlink;
use crate::sheet::{SheetData, SpreadsheetFile};
use std::collections::HashMap;
use tracing::{debug, info};

/// Canonical header label: trimmed and lowercased
pub fn canonical_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Header label to 1-based column index for one header row
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    row: u32,
    columns: HashMap<String, u32>,
}

impl HeaderMap {
    /// Index every non-empty label of a 1-based row. A repeated label keeps
    /// its last column.
    pub fn from_row(sheet: &SheetData, row: u32) -> Self {
        let columns = sheet
            .row_text(row)
            .iter()
            .enumerate()
            .filter_map(|(index, text)| {
                let label = canonical_label(text);
                (!label.is_empty()).then_some((label, index as u32 + 1))
            })
            .collect();
        Self { row, columns }
    }

    /// Header row holding `labels` from column A onwards
    pub fn from_labels<I, S>(row: u32, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = labels
            .into_iter()
            .enumerate()
            .filter_map(|(index, label)| {
                let label = canonical_label(label.as_ref());
                (!label.is_empty()).then_some((label, index as u32 + 1))
            })
            .collect();
        Self { row, columns }
    }

    /// Column of the first synonym present
    pub fn resolve(&self, synonyms: &[&str]) -> Option<u32> {
        synonyms
            .iter()
            .find_map(|synonym| self.columns.get(&canonical_label(synonym)).copied())
    }

    /// Number of synonym groups with at least one hit
    pub fn score(&self, groups: &[&[&str]]) -> usize {
        groups
            .iter()
            .filter(|synonyms| self.resolve(synonyms).is_some())
            .count()
    }

    /// 1-based row the labels were read from
    pub fn row(&self) -> u32 {
        self.row
    }

    /// First row below the header
    pub fn first_data_row(&self) -> u32 {
        self.row + 1
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Where to look for a download link when no header names one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFallback {
    /// Probe one fixed column
    Column(u32),
    /// Take the first linked column up to `last_column`
    Scan { last_column: u32 },
}

/// Resolve the download-link column, falling back to probing the first data
/// row for a hyperlink-shaped cell
pub fn resolve_link_column(
    headers: &HeaderMap,
    sheet: &SheetData,
    synonyms: &[&str],
    fallback: LinkFallback,
) -> Option<u32> {
    if let Some(column) = headers.resolve(synonyms) {
        return Some(column);
    }

    let row = headers.first_data_row();
    let holds_link =
        |col: u32| extract_hyperlink(sheet.cell(row, col), sheet.hyperlink(row, col)).is_some();

    let column = match fallback {
        LinkFallback::Column(col) => holds_link(col).then_some(col),
        LinkFallback::Scan { last_column } => {
            (1..=last_column.min(sheet.max_column())).find(|&col| holds_link(col))
        }
    };

    match column {
        Some(col) => info!(
            "DownloadLink: no header found in '{}', using column {}",
            sheet.name(),
            col
        ),
        None => debug!("DownloadLink: no link column in '{}'", sheet.name()),
    }
    column
}

/// When a set of critical fields counts as mismatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalRule {
    /// Every critical field is absent
    AllMissing,
    /// At least one critical field is absent
    AnyMissing,
}

/// Diagnostic for critical fields that did not resolve
pub fn check_critical(
    dataset: &str,
    fields: &[(&str, Option<u32>)],
    rule: CriticalRule,
) -> Option<XaurumError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, column)| column.is_none())
        .map(|(label, _)| *label)
        .collect();

    let mismatch = match rule {
        CriticalRule::AllMissing => !fields.is_empty() && missing.len() == fields.len(),
        CriticalRule::AnyMissing => !missing.is_empty(),
    };
    mismatch.then(|| XaurumError::SchemaMismatch {
        dataset: dataset.to_string(),
        missing: missing.join(", "),
    })
}

/// Pick the worksheet to read.
///
/// The first worksheet is used unless its header row matches none of the
/// synonym groups while another worksheet matches some.
pub fn best_sheet(
    file: &mut SpreadsheetFile,
    header_row: u32,
    groups: &[&[&str]],
) -> Result<SheetData> {
    let first = file.first_sheet()?;
    let first_score = HeaderMap::from_row(&first, header_row).score(groups);
    if first_score > 0 {
        return Ok(first);
    }

    let mut best: Option<(usize, SheetData)> = None;
    for name in file.sheet_names().into_iter().skip(1) {
        let sheet = match file.read_sheet(&name) {
            Ok(sheet) => sheet,
            Err(e) => {
                debug!("Skipping unreadable sheet '{}': {}", name, e);
                continue;
            }
        };
        let score = HeaderMap::from_row(&sheet, header_row).score(groups);
        if score > best.as_ref().map(|(s, _)| *s).unwrap_or(0) {
            best = Some((score, sheet));
        }
    }

    match best {
        Some((score, sheet)) => {
            info!(
                "Using sheet '{}' ({} header matches) instead of '{}'",
                sheet.name(),
                score,
                first.name()
            );
            Ok(sheet)
        }
        None => Ok(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::CellValue;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn test_header_labels_are_case_and_whitespace_insensitive() {
        let headers = HeaderMap::from_labels(1, [" CertName ", "Naam"]);
        assert_eq!(headers.resolve(&["certname"]), Some(1));
        assert_eq!(headers.resolve(&["  CERTNAME"]), Some(1));
        assert_eq!(headers.resolve(&["name", "naam"]), Some(2));
        assert_eq!(headers.resolve(&["missing"]), None);
    }

    #[test]
    fn test_first_synonym_wins() {
        let headers = HeaderMap::from_labels(1, ["gid", "staffgid"]);
        assert_eq!(headers.resolve(&["staffgid", "gid"]), Some(2));
        assert_eq!(headers.resolve(&["gid", "staffgid"]), Some(1));
    }

    #[test]
    fn test_repeated_label_keeps_last_column() {
        let headers = HeaderMap::from_labels(1, ["Service", "", "service"]);
        assert_eq!(headers.resolve(&["service"]), Some(3));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_header_on_second_row() {
        let sheet = SheetData::from_rows(
            "Training",
            vec![vec![], vec![text("Naam"), text("Opleiding")]],
        );
        let headers = HeaderMap::from_row(&sheet, 2);
        assert_eq!(headers.resolve(&["opleiding"]), Some(2));
        assert_eq!(headers.first_data_row(), 3);
    }

    #[test]
    fn test_link_fallback_to_column_h() {
        let mut header = vec![text("Naam")];
        header.resize(7, CellValue::Empty);
        let mut data = vec![text("Jan")];
        data.resize(7, CellValue::Empty);
        data.push(text("Druk"));

        let sheet = SheetData::from_rows("Certificates", vec![header.clone(), data])
            .with_hyperlink(2, 8, "https://x/cert.pdf");
        let headers = HeaderMap::from_row(&sheet, 1);

        let column =
            resolve_link_column(&headers, &sheet, &["downloadlink"], LinkFallback::Column(8));
        assert_eq!(column, Some(8));

        let unlinked = SheetData::from_rows("Certificates", vec![header, vec![text("Jan")]]);
        let column =
            resolve_link_column(&headers, &unlinked, &["downloadlink"], LinkFallback::Column(8));
        assert_eq!(column, None);
    }

    #[test]
    fn test_link_scan_takes_first_url_column() {
        let sheet = SheetData::from_rows(
            "Results",
            vec![
                vec![text("GID"), text("Cert"), text("")],
                vec![text("G1"), text("https://x/one"), text("https://x/two")],
            ],
        );
        let headers = HeaderMap::from_row(&sheet, 1);
        let column = resolve_link_column(
            &headers,
            &sheet,
            &["download"],
            LinkFallback::Scan { last_column: 19 },
        );
        assert_eq!(column, Some(2));
    }

    #[test]
    fn test_check_critical_lists_missing_fields() {
        let rule = CriticalRule::AnyMissing;
        assert!(check_critical("Training", &[("Naam/Name", Some(1))], rule).is_none());
        let fields = [("Naam/Name", None), ("CertName", Some(2))];
        match check_critical("Training", &fields, rule) {
            Some(XaurumError::SchemaMismatch { dataset, missing }) => {
                assert_eq!(dataset, "Training");
                assert_eq!(missing, "Naam/Name");
            }
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_check_critical_all_missing_rule() {
        let rule = CriticalRule::AllMissing;
        let partial = [("Employee_Name", None), ("CertName", Some(5))];
        assert!(check_critical("Certificates", &partial, rule).is_none());

        let none = [("Employee_Name", None), ("CertName", None)];
        let error = check_critical("Certificates", &none, rule).unwrap();
        assert!(error.to_string().contains("Employee_Name, CertName"));
    }

    #[test]
    fn test_best_sheet_prefers_matching_headers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export.xlsx");

        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "Generated report").unwrap();
        let data = workbook.add_worksheet();
        data.set_name("Data").unwrap();
        data.write_string(0, 0, "Naam").unwrap();
        data.write_string(0, 1, "Certificaat").unwrap();
        workbook.save(&path).unwrap();

        let mut file = SpreadsheetFile::open(&path).unwrap();
        let sheet = best_sheet(&mut file, 1, &[&["naam"], &["certificaat"]]).unwrap();
        assert_eq!(sheet.name(), "Data");

        let sheet = best_sheet(&mut file, 1, &[&["unrelated"]]).unwrap();
        assert_eq!(sheet.name(), "Cover");
    }
}
