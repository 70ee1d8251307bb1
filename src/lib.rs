//! Xaurum Processor Library
//!
//! Converts the spreadsheet exports fetched from the Xaurum training portal
//! into standardized, deduplicated ReadyForFlow `.xlsx` tables.
//!
//! This library provides tools for:
//! - Normalizing legacy `.xls` inputs to `.xlsx`, natively or through an
//!   external spreadsheet application
//! - Resolving multilingual header synonyms and recovering hyperlinks
//! - Normalizing identifiers, dates and certificate names
//! - Deduplicating certificates and joining SAP numbers from the Staff master
//! - Writing each dataset as one named Excel table

pub mod config;
pub mod constants;
pub mod convert;
pub mod error;
pub mod header;
pub mod models;
pub mod normalize;
pub mod processor;
pub mod sheet;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::ConverterConfig;
pub use error::{Result, XaurumError};
pub use models::{DatasetKind, DatasetOutcome, DatasetReport, DatasetSummary, RunReport};
pub use processor::Pipeline;
