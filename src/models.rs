//! Core data structures for Xaurum conversion.
//!
//! Dataset kinds with their fixed output layout, one record type per kind,
//! the identity key used for deduplication and the per-run report.

use crate::constants::columns;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The five datasets a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Staff,
    Certificates,
    Competences,
    Training,
    CertResults,
}

impl DatasetKind {
    /// Kinds converted from fetched exports, in processing order
    pub const CONVERTED: [DatasetKind; 4] = [
        DatasetKind::Certificates,
        DatasetKind::Competences,
        DatasetKind::Training,
        DatasetKind::CertResults,
    ];

    /// Every kind, in processing order
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Staff,
        DatasetKind::Certificates,
        DatasetKind::Competences,
        DatasetKind::Training,
        DatasetKind::CertResults,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::Staff => "Staff",
            DatasetKind::Certificates => "Certificates",
            DatasetKind::Competences => "Competences",
            DatasetKind::Training => "Training",
            DatasetKind::CertResults => "CertResults",
        }
    }

    /// Worksheet name in the output workbook
    pub fn sheet_name(&self) -> &'static str {
        match self {
            DatasetKind::Staff => "Staff",
            DatasetKind::Certificates => "Certificates",
            DatasetKind::Competences => "Competences",
            DatasetKind::Training => "TrainingReq",
            DatasetKind::CertResults => "CertificationResults",
        }
    }

    /// Name of the Excel table covering the output
    pub fn table_name(&self) -> &'static str {
        match self {
            DatasetKind::Staff => "tblStaff",
            DatasetKind::Certificates => "tblCertificates",
            DatasetKind::Competences => "tblCompetences",
            DatasetKind::Training => "tblTrainingReq",
            DatasetKind::CertResults => "tblCertResults",
        }
    }

    /// 1-based header row of the source export
    pub fn header_row(&self) -> u32 {
        match self {
            DatasetKind::Training => 2,
            _ => 1,
        }
    }

    /// Output columns, in order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Staff => columns::STAFF,
            DatasetKind::Certificates => columns::CERTIFICATES,
            DatasetKind::Competences => columns::COMPETENCES,
            DatasetKind::Training => columns::TRAINING,
            DatasetKind::CertResults => columns::CERT_RESULTS,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A normalized output row
pub trait CanonicalRecord {
    const KIND: DatasetKind;

    /// Field values in [`DatasetKind::columns`] order
    fn values(&self) -> Vec<&str>;

    /// Every field empty
    fn is_blank(&self) -> bool {
        self.values().iter().all(|value| value.is_empty())
    }
}

/// Deduplication key: who holds which certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub person: String,
    pub cert_name: String,
}

/// Records grouped by [`IdentityKey`] with the latest expiry winning
pub trait Deduplicate {
    fn identity_key(&self) -> IdentityKey;

    /// Expiry date as written, expected `YYYY-MM-DD`
    fn expiry(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffRecord {
    pub staff_gid: String,
    pub staff_sap: String,
    pub employee_name: String,
    pub service: String,
}

impl CanonicalRecord for StaffRecord {
    const KIND: DatasetKind = DatasetKind::Staff;

    fn values(&self) -> Vec<&str> {
        vec![
            self.staff_gid.as_str(),
            self.staff_sap.as_str(),
            self.employee_name.as_str(),
            self.service.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateRecord {
    pub employee_name: String,
    pub service: String,
    pub staff_gid: String,
    pub staff_sap: String,
    pub cert_name: String,
    pub issued_date: String,
    pub expiry_date: String,
    pub future_certificates: String,
    pub download_link: String,
}

impl CanonicalRecord for CertificateRecord {
    const KIND: DatasetKind = DatasetKind::Certificates;

    fn values(&self) -> Vec<&str> {
        vec![
            self.employee_name.as_str(),
            self.service.as_str(),
            self.staff_gid.as_str(),
            self.staff_sap.as_str(),
            self.cert_name.as_str(),
            self.issued_date.as_str(),
            self.expiry_date.as_str(),
            self.future_certificates.as_str(),
            self.download_link.as_str(),
        ]
    }
}

impl Deduplicate for CertificateRecord {
    /// Person is the first non-empty of GID, SAP and name, never a mix
    fn identity_key(&self) -> IdentityKey {
        let person = [&self.staff_gid, &self.staff_sap, &self.employee_name]
            .into_iter()
            .find(|value| !value.is_empty())
            .cloned()
            .unwrap_or_default();
        IdentityKey {
            person,
            cert_name: self.cert_name.clone(),
        }
    }

    fn expiry(&self) -> &str {
        &self.expiry_date
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetenceRecord {
    pub staff_gid: String,
    pub staff_sap: String,
    pub employee_name: String,
    pub comp_name: String,
    pub achieved_on: String,
    pub valid_until: String,
    pub service: String,
    pub remark: String,
    pub program: String,
}

impl CanonicalRecord for CompetenceRecord {
    const KIND: DatasetKind = DatasetKind::Competences;

    fn values(&self) -> Vec<&str> {
        vec![
            self.staff_gid.as_str(),
            self.staff_sap.as_str(),
            self.employee_name.as_str(),
            self.comp_name.as_str(),
            self.achieved_on.as_str(),
            self.valid_until.as_str(),
            self.service.as_str(),
            self.remark.as_str(),
            self.program.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingRecord {
    pub employee_name: String,
    pub staff_gid: String,
    pub staff_sap: String,
    pub service: String,
    pub cert_name: String,
    pub category: String,
    pub request_status: String,
    pub scheduled_date: String,
    pub duration: String,
    pub language: String,
    pub location: String,
    pub site: String,
}

impl CanonicalRecord for TrainingRecord {
    const KIND: DatasetKind = DatasetKind::Training;

    fn values(&self) -> Vec<&str> {
        vec![
            self.employee_name.as_str(),
            self.staff_gid.as_str(),
            self.staff_sap.as_str(),
            self.service.as_str(),
            self.cert_name.as_str(),
            self.category.as_str(),
            self.request_status.as_str(),
            self.scheduled_date.as_str(),
            self.duration.as_str(),
            self.language.as_str(),
            self.location.as_str(),
            self.site.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertResultRecord {
    pub staff_gid: String,
    pub staff_sap: String,
    pub name: String,
    pub organizer: String,
    pub cert_name: String,
    pub status: String,
    pub achieved: String,
    pub session_start: String,
    pub session_end: String,
    pub valid_until: String,
    pub service: String,
    pub manager: String,
    pub manager_gid: String,
    pub program: String,
    pub download_link: String,
}

impl CanonicalRecord for CertResultRecord {
    const KIND: DatasetKind = DatasetKind::CertResults;

    fn values(&self) -> Vec<&str> {
        vec![
            self.staff_gid.as_str(),
            self.staff_sap.as_str(),
            self.name.as_str(),
            self.organizer.as_str(),
            self.cert_name.as_str(),
            self.status.as_str(),
            self.achieved.as_str(),
            self.session_start.as_str(),
            self.session_end.as_str(),
            self.valid_until.as_str(),
            self.service.as_str(),
            self.manager.as_str(),
            self.manager_gid.as_str(),
            self.program.as_str(),
            self.download_link.as_str(),
        ]
    }
}

/// Counters from converting one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    pub blank_rows: usize,
    pub duplicates_removed: usize,
    pub lookup_misses: usize,
}

/// What happened to one dataset
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetOutcome {
    Written {
        path: PathBuf,
        summary: DatasetSummary,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub kind: DatasetKind,
    pub input: Option<PathBuf>,
    pub outcome: DatasetOutcome,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub datasets: Vec<DatasetReport>,
    pub lookup_entries: usize,
    pub processing_time: Duration,
}

impl RunReport {
    pub fn get(&self, kind: DatasetKind) -> Option<&DatasetReport> {
        self.datasets.iter().find(|report| report.kind == kind)
    }

    pub fn written(&self) -> usize {
        self.datasets
            .iter()
            .filter(|report| matches!(report.outcome, DatasetOutcome::Written { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.datasets.len() - self.written()
    }

    /// GIDs in Certification Results without a Staff match
    pub fn lookup_misses(&self) -> usize {
        self.datasets
            .iter()
            .filter_map(|report| match &report.outcome {
                DatasetOutcome::Written { summary, .. } => Some(summary.lookup_misses),
                DatasetOutcome::Skipped { .. } => None,
            })
            .sum()
    }
}
