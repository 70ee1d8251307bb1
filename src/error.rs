//! Error handling for Xaurum conversion runs.
//!
//! Every failure that can end a dataset's processing is represented here.
//! The pipeline driver catches these per dataset, so none of them aborts a
//! whole run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XaurumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Workbook XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Conversion failed for file: {path} - {reason}")]
    Conversion { path: PathBuf, reason: String },

    #[error("No input file found for {dataset} (patterns: {patterns})")]
    MissingInput { dataset: String, patterns: String },

    #[error("Schema mismatch in {dataset}: critical columns not found: {missing}")]
    SchemaMismatch { dataset: String, missing: String },

    #[error("External application error ({application}): {reason}")]
    ExternalApplication { application: String, reason: String },

    #[error("Workbook has no usable worksheet: {path}")]
    NoWorksheet { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl XaurumError {
    /// Conversion failure with context
    pub fn conversion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// External application failure with context
    pub fn external(application: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalApplication {
            application: application.into(),
            reason: reason.into(),
        }
    }

    /// Configuration failure
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XaurumError>;
