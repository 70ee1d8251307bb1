//! Staff master refresh and loading
//!
//! The Staff dataset is not converted from a fetched export. It is exported
//! from the master workbook, whose query is refreshed through the external
//! spreadsheet application, and then read back as the GID lookup source.

use super::writer::{TableWriter, unique_headers};
use crate::constants::{STAFF_SHEET_NAMES, WORKING_COPY_PREFIX, synonyms};
use crate::convert::office::{ApplicationLauncher, ApplicationSession};
use crate::error::{Result, XaurumError};
use crate::header::HeaderMap;
use crate::models::{CanonicalRecord, DatasetKind, StaffRecord};
use crate::sheet::SpreadsheetFile;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// What a refresh produced at the Staff output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Freshly exported with this many data rows
    Refreshed { rows: usize },
    /// An existing file was left in place
    Reused,
    /// Nothing was produced
    Unavailable { reason: String },
}

/// Produces the canonical Staff file at `target`
pub trait StaffRefresher: Send + Sync + Debug {
    fn refresh(&self, target: &Path) -> Result<RefreshOutcome>;
}

/// Consume whatever Staff output already exists
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingStaffFile;

impl StaffRefresher for ExistingStaffFile {
    fn refresh(&self, target: &Path) -> Result<RefreshOutcome> {
        if target.is_file() {
            info!("Using existing Staff file {}", target.display());
            Ok(RefreshOutcome::Reused)
        } else {
            Ok(RefreshOutcome::Unavailable {
                reason: format!("no Staff file at {}", target.display()),
            })
        }
    }
}

/// Refresh the master workbook and export its staff sheet
#[derive(Debug, Clone)]
pub struct MasterWorkbookRefresh {
    master: PathBuf,
    launcher: Option<Arc<dyn ApplicationLauncher>>,
}

impl MasterWorkbookRefresh {
    pub fn new(master: PathBuf, launcher: Option<Arc<dyn ApplicationLauncher>>) -> Self {
        Self { master, launcher }
    }

    pub fn master(&self) -> &Path {
        &self.master
    }

    /// Open, refresh and save the working copy as `.xlsx` in `staging`
    fn refresh_through(
        &self,
        launcher: &dyn ApplicationLauncher,
        working_copy: &Path,
        staging: &Path,
    ) -> Result<PathBuf> {
        let refreshed = staging.join("master_refreshed.xlsx");
        let mut session = ApplicationSession::start(launcher)?;
        session.open(working_copy, false)?;
        info!("Refreshing queries in {}", self.master.display());
        session.refresh_all()?;
        session.save_as_canonical(&refreshed)?;
        session.release();
        Ok(refreshed)
    }
}

impl StaffRefresher for MasterWorkbookRefresh {
    fn refresh(&self, target: &Path) -> Result<RefreshOutcome> {
        if !self.master.is_file() {
            warn!("Master workbook not found: {}", self.master.display());
            return Ok(RefreshOutcome::Unavailable {
                reason: format!("master workbook not found: {}", self.master.display()),
            });
        }

        let working_copy = WorkingCopy::create(&self.master)?;
        let staging = TempDir::new()?;

        let source = match &self.launcher {
            Some(launcher) => {
                match self.refresh_through(launcher.as_ref(), working_copy.path(), staging.path()) {
                    Ok(refreshed) => refreshed,
                    Err(e) => {
                        warn!(
                            "Refresh through {} failed, exporting cached master data: {}",
                            launcher.name(),
                            e
                        );
                        working_copy.path().to_path_buf()
                    }
                }
            }
            None => {
                warn!("No spreadsheet application configured, exporting cached master data");
                working_copy.path().to_path_buf()
            }
        };

        match export_staff_sheet(&source, target)? {
            Some(rows) => Ok(RefreshOutcome::Refreshed { rows }),
            None => Ok(RefreshOutcome::Unavailable {
                reason: format!(
                    "no staff sheet ({}) in {}",
                    STAFF_SHEET_NAMES.join(", "),
                    self.master.display()
                ),
            }),
        }
    }
}

/// Temporary sibling copy of the master, removed on drop
struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    fn create(master: &Path) -> Result<Self> {
        let file_name = master
            .file_name()
            .ok_or_else(|| XaurumError::configuration("master workbook path has no file name"))?;
        let path = master.with_file_name(format!(
            "{}{}",
            WORKING_COPY_PREFIX,
            file_name.to_string_lossy()
        ));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        fs::copy(master, &path)?;
        debug!("Working copy at {}", path.display());
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Could not remove working copy {}: {}", self.path.display(), e);
        }
    }
}

/// Write the staff sheet of `source` verbatim, every column kept. `None`
/// when the workbook has no staff sheet.
pub fn export_staff_sheet(source: &Path, target: &Path) -> Result<Option<usize>> {
    let mut file = SpreadsheetFile::open(source)?;
    let Some(sheet) = file.find_sheet(STAFF_SHEET_NAMES)? else {
        warn!("Staff sheet not found in {}", source.display());
        return Ok(None);
    };
    info!("Exporting staff sheet '{}'", sheet.name());

    let header = unique_headers(&sheet.row_text(1));
    let rows: Vec<Vec<String>> = (2..=sheet.max_row())
        .map(|row| sheet.row_text(row))
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect();

    let kind = DatasetKind::Staff;
    let written = TableWriter::new(target.to_path_buf()).write_table(
        kind.sheet_name(),
        kind.table_name(),
        &header,
        &rows,
    )?;
    Ok(Some(written))
}

/// Read Staff rows from the first worksheet of a Staff file
pub fn load_staff(path: &Path) -> Result<Vec<StaffRecord>> {
    let sheet = SpreadsheetFile::open(path)?.first_sheet()?;
    let headers = HeaderMap::from_row(&sheet, 1);

    let gid = headers.resolve(synonyms::staff::GID);
    let sap = headers.resolve(synonyms::staff::SAP);
    let name = headers.resolve(synonyms::staff::NAME);
    let service = headers.resolve(synonyms::staff::SERVICE);
    if gid.is_none() || sap.is_none() {
        warn!(
            "Staff file {} lacks a staffGID or staffSAPNR column",
            path.display()
        );
    }

    let text = |row: u32, col: Option<u32>| {
        col.map(|col| sheet.cell(row, col).as_text())
            .unwrap_or_default()
    };
    let records: Vec<StaffRecord> = (headers.first_data_row()..=sheet.max_row())
        .map(|row| StaffRecord {
            staff_gid: text(row, gid),
            staff_sap: text(row, sap),
            employee_name: text(row, name),
            service: text(row, service),
        })
        .filter(|record| !record.is_blank())
        .collect();

    debug!("Loaded {} Staff rows from {}", records.len(), path.display());
    Ok(records)
}
