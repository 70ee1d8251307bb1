//! Conversion recipes, one per fetched dataset
//!
//! Each recipe reads a canonical workbook, resolves its headers through the
//! synonym tables, normalizes every data row into the dataset's record type
//! and writes the result as a named table.

use super::deduplication::deduplicate;
use super::lookup::LookupTable;
use super::writer::TableWriter;
use crate::constants::{LINK_SCAN_COLUMNS, synonyms};
use crate::error::{Result, XaurumError};
use crate::header::{
    CriticalRule, HeaderMap, LinkFallback, best_sheet, check_critical, resolve_link_column,
};
use crate::models::{
    CanonicalRecord, CertResultRecord, CertificateRecord, CompetenceRecord, DatasetKind,
    DatasetSummary, TrainingRecord,
};
use crate::normalize::{extract_hyperlink, normalize_cert_name, normalize_date, normalize_id_cell};
use crate::sheet::{SheetData, SpreadsheetFile};
use std::path::Path;
use tracing::{debug, info, warn};

/// Inputs shared by the recipes
#[derive(Debug, Clone, Copy)]
pub struct RecipeContext<'a> {
    pub lookup: &'a LookupTable,
    /// Column probed for an unlabelled download link
    pub link_fallback_column: u32,
}

/// Convert one dataset from `source` into `output`
pub fn run_recipe(
    kind: DatasetKind,
    source: &Path,
    output: &Path,
    context: RecipeContext<'_>,
) -> Result<DatasetSummary> {
    let summary = match kind {
        DatasetKind::Certificates => convert_certificates(source, output, context)?,
        DatasetKind::Competences => convert_competences(source, output, context)?,
        DatasetKind::Training => convert_training(source, output)?,
        DatasetKind::CertResults => convert_cert_results(source, output, context)?,
        DatasetKind::Staff => {
            return Err(XaurumError::configuration(
                "Staff is exported from the master workbook, not converted",
            ));
        }
    };
    info!(
        "{} converted -> {} ({} rows)",
        kind,
        output.display(),
        summary.rows_written
    );
    Ok(summary)
}

/// Cell accessors for one data row; an unresolved column reads as empty
struct RowCells<'a> {
    sheet: &'a SheetData,
    row: u32,
}

impl<'a> RowCells<'a> {
    fn new(sheet: &'a SheetData, row: u32) -> Self {
        Self { sheet, row }
    }

    fn text(&self, column: Option<u32>) -> String {
        column
            .map(|col| self.sheet.cell(self.row, col).as_text())
            .unwrap_or_default()
    }

    fn id(&self, column: Option<u32>) -> String {
        column
            .map(|col| normalize_id_cell(self.sheet.cell(self.row, col)))
            .unwrap_or_default()
    }

    fn date(&self, column: Option<u32>) -> String {
        column
            .map(|col| normalize_date(self.sheet.cell(self.row, col)))
            .unwrap_or_default()
    }

    fn cert_name(&self, column: Option<u32>) -> String {
        normalize_cert_name(&self.text(column))
    }

    fn link(&self, column: Option<u32>) -> String {
        column
            .and_then(|col| {
                extract_hyperlink(
                    self.sheet.cell(self.row, col),
                    self.sheet.hyperlink(self.row, col),
                )
            })
            .unwrap_or_default()
    }

    /// Hyperlink target when present, else the cell text
    fn link_or_text(&self, column: Option<u32>) -> String {
        match self.link(column) {
            link if link.is_empty() => self.text(column),
            link => link,
        }
    }
}

/// Open the canonical workbook and pick the sheet matching `groups` best
fn open_dataset(
    source: &Path,
    kind: DatasetKind,
    groups: &[&[&str]],
) -> Result<(SheetData, HeaderMap)> {
    let mut file = SpreadsheetFile::open(source)?;
    let sheet = best_sheet(&mut file, kind.header_row(), groups)?;
    let headers = HeaderMap::from_row(&sheet, kind.header_row());
    debug!(
        "{}: sheet '{}', {} header labels, {} rows",
        kind,
        sheet.name(),
        headers.len(),
        sheet.max_row()
    );
    Ok((sheet, headers))
}

fn warn_on_mismatch(kind: DatasetKind, fields: &[(&str, Option<u32>)], rule: CriticalRule) {
    if let Some(mismatch) = check_critical(kind.label(), fields, rule) {
        warn!("{}", mismatch);
    }
}

/// Collect non-blank records from every data row
fn collect_rows<R, F>(
    sheet: &SheetData,
    headers: &HeaderMap,
    summary: &mut DatasetSummary,
    keep: impl Fn(&R) -> bool,
    build: F,
) -> Vec<R>
where
    R: CanonicalRecord,
    F: Fn(&RowCells<'_>) -> R,
{
    let mut records = Vec::new();
    for row in headers.first_data_row()..=sheet.max_row() {
        summary.rows_read += 1;
        let record = build(&RowCells::new(sheet, row));
        if record.is_blank() || !keep(&record) {
            summary.blank_rows += 1;
            continue;
        }
        records.push(record);
    }
    records
}

/// Certificates: normalized names and dates, deduplicated per person and
/// certificate
pub fn convert_certificates(
    source: &Path,
    output: &Path,
    context: RecipeContext<'_>,
) -> Result<DatasetSummary> {
    use synonyms::certificates as syn;
    let kind = DatasetKind::Certificates;
    let (sheet, headers) = open_dataset(
        source,
        kind,
        &[syn::EMPLOYEE, syn::GID, syn::SAP, syn::CERT, syn::ISSUED, syn::EXPIRY],
    )?;

    let employee = headers.resolve(syn::EMPLOYEE);
    let service = headers.resolve(syn::SERVICE);
    let gid = headers.resolve(syn::GID);
    let sap = headers.resolve(syn::SAP);
    let cert = headers.resolve(syn::CERT);
    let issued = headers.resolve(syn::ISSUED);
    let expiry = headers.resolve(syn::EXPIRY);
    let future = headers.resolve(syn::FUTURE);
    let link = resolve_link_column(
        &headers,
        &sheet,
        syn::LINK,
        LinkFallback::Column(context.link_fallback_column),
    );
    warn_on_mismatch(
        kind,
        &[("Employee_Name", employee), ("CertName", cert)],
        CriticalRule::AllMissing,
    );

    let mut summary = DatasetSummary::default();
    let records = collect_rows(&sheet, &headers, &mut summary, |_| true, |cells| {
        CertificateRecord {
            employee_name: cells.text(employee),
            service: cells.text(service),
            staff_gid: cells.text(gid),
            staff_sap: cells.id(sap),
            cert_name: cells.cert_name(cert),
            issued_date: cells.date(issued),
            expiry_date: cells.date(expiry),
            future_certificates: cells.text(future),
            download_link: cells.link(link),
        }
    });

    let deduplicated = deduplicate(records);
    summary.duplicates_removed = deduplicated.duplicates_removed;
    summary.rows_written =
        TableWriter::new(output.to_path_buf()).write_records(&deduplicated.records)?;
    Ok(summary)
}

/// Competences: achievement and validity dates normalized, Program taken
/// from the link column
pub fn convert_competences(
    source: &Path,
    output: &Path,
    context: RecipeContext<'_>,
) -> Result<DatasetSummary> {
    use synonyms::competences as syn;
    let kind = DatasetKind::Competences;
    let (sheet, headers) = open_dataset(
        source,
        kind,
        &[syn::GID, syn::SAP, syn::EMPLOYEE, syn::COMPETENCE, syn::ACHIEVED],
    )?;

    let gid = headers.resolve(syn::GID);
    let sap = headers.resolve(syn::SAP);
    let employee = headers.resolve(syn::EMPLOYEE);
    let competence = headers.resolve(syn::COMPETENCE);
    let achieved = headers.resolve(syn::ACHIEVED);
    let valid_until = headers.resolve(syn::VALID_UNTIL);
    let service = headers.resolve(syn::SERVICE);
    let remark = headers.resolve(syn::REMARK);
    let link = resolve_link_column(
        &headers,
        &sheet,
        syn::LINK,
        LinkFallback::Column(context.link_fallback_column),
    );
    warn_on_mismatch(
        kind,
        &[("Employee_Name", employee), ("CompName", competence)],
        CriticalRule::AllMissing,
    );

    let mut summary = DatasetSummary::default();
    let records = collect_rows(&sheet, &headers, &mut summary, |_| true, |cells| {
        CompetenceRecord {
            staff_gid: cells.text(gid),
            staff_sap: cells.id(sap),
            employee_name: cells.text(employee),
            comp_name: cells.text(competence),
            achieved_on: cells.date(achieved),
            valid_until: cells.date(valid_until),
            service: cells.text(service),
            remark: cells.text(remark),
            program: cells.link_or_text(link),
        }
    });

    summary.rows_written = TableWriter::new(output.to_path_buf()).write_records(&records)?;
    Ok(summary)
}

/// Training requests: header on row 2, data from row 3
pub fn convert_training(source: &Path, output: &Path) -> Result<DatasetSummary> {
    use synonyms::training as syn;
    let kind = DatasetKind::Training;
    let (sheet, headers) = open_dataset(
        source,
        kind,
        &[syn::NAME, syn::GID, syn::CERT, syn::STATUS, syn::DATE],
    )?;

    let name = headers.resolve(syn::NAME);
    let gid = headers.resolve(syn::GID);
    let employee_number = headers.resolve(syn::EMPLOYEE_NUMBER);
    let service = headers.resolve(syn::SERVICE);
    let cert = headers.resolve(syn::CERT);
    let category = headers.resolve(syn::CATEGORY);
    let status = headers.resolve(syn::STATUS);
    let date = headers.resolve(syn::DATE);
    let duration = headers.resolve(syn::DURATION);
    let language = headers.resolve(syn::LANGUAGE);
    let location = headers.resolve(syn::LOCATION);
    let site = headers.resolve(syn::SITE);
    warn_on_mismatch(
        kind,
        &[("Naam/Name", name), ("Opleiding/CertName", cert)],
        CriticalRule::AnyMissing,
    );

    let mut summary = DatasetSummary::default();
    let records = collect_rows(&sheet, &headers, &mut summary, |_| true, |cells| {
        TrainingRecord {
            employee_name: cells.text(name),
            staff_gid: cells.text(gid),
            staff_sap: cells.id(employee_number),
            service: cells.text(service),
            cert_name: cells.cert_name(cert),
            category: cells.text(category),
            request_status: cells.text(status),
            scheduled_date: cells.date(date),
            duration: cells.text(duration),
            language: cells.text(language),
            location: cells.text(location),
            site: cells.text(site),
        }
    });

    summary.rows_written = TableWriter::new(output.to_path_buf()).write_records(&records)?;
    Ok(summary)
}

/// Certification results: SAP numbers come from the Staff lookup, not the
/// export
pub fn convert_cert_results(
    source: &Path,
    output: &Path,
    context: RecipeContext<'_>,
) -> Result<DatasetSummary> {
    use synonyms::cert_results as syn;
    let kind = DatasetKind::CertResults;
    let (sheet, headers) = open_dataset(
        source,
        kind,
        &[syn::GID, syn::NAME, syn::CERT, syn::STATUS, syn::ACHIEVED],
    )?;

    let gid = headers.resolve(syn::GID);
    let name = headers.resolve(syn::NAME);
    let organizer = headers.resolve(syn::ORGANIZER);
    let cert = headers.resolve(syn::CERT);
    let status = headers.resolve(syn::STATUS);
    let achieved = headers.resolve(syn::ACHIEVED);
    let session_start = headers.resolve(syn::SESSION_START);
    let session_end = headers.resolve(syn::SESSION_END);
    let valid_until = headers.resolve(syn::VALID_UNTIL);
    let service = headers.resolve(syn::SERVICE);
    let manager = headers.resolve(syn::MANAGER);
    let manager_gid = headers.resolve(syn::MANAGER_GID);
    let program = headers.resolve(syn::PROGRAM);
    let link = resolve_link_column(
        &headers,
        &sheet,
        syn::LINK,
        LinkFallback::Scan {
            last_column: LINK_SCAN_COLUMNS,
        },
    );
    warn_on_mismatch(
        kind,
        &[("staffGID", gid), ("CertName", cert)],
        CriticalRule::AllMissing,
    );
    if context.lookup.is_empty() {
        warn!("Staff lookup is empty, staffSAPNR stays blank for {}", kind);
    }

    let mut summary = DatasetSummary::default();
    // A row needs at least one identifying field to be kept
    let identifying = |record: &CertResultRecord| {
        [
            &record.staff_gid,
            &record.name,
            &record.cert_name,
            &record.status,
            &record.achieved,
        ]
        .iter()
        .any(|value| !value.is_empty())
    };
    let mut records = collect_rows(&sheet, &headers, &mut summary, identifying, |cells| {
        CertResultRecord {
            staff_gid: cells.text(gid),
            staff_sap: String::new(),
            name: cells.text(name),
            organizer: cells.text(organizer),
            cert_name: cells.cert_name(cert),
            status: cells.text(status),
            achieved: cells.date(achieved),
            session_start: cells.date(session_start),
            session_end: cells.date(session_end),
            valid_until: cells.date(valid_until),
            service: cells.text(service),
            manager: cells.text(manager),
            manager_gid: cells.text(manager_gid),
            program: cells.text(program),
            download_link: cells.link(link),
        }
    });

    let stats = context.lookup.join(&mut records);
    summary.lookup_misses = stats.missing;
    summary.rows_written = TableWriter::new(output.to_path_buf()).write_records(&records)?;
    Ok(summary)
}
