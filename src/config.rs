//! Configuration management and validation.
//!
//! Every location a run touches is derived from one tool root directory and
//! can be overridden, in order, by environment variables, a TOML file and
//! command-line flags.

use crate::constants::{
    CERT_RESULTS_OUTPUT, CERTIFICATES_OUTPUT, COMPETENCES_OUTPUT, DEFAULT_EXTERNAL_TIMEOUT_SECS,
    DEFAULT_OFFICE_BINARY, DEFAULT_ROOT_DIR_NAME, DOWNLOAD_DIR_NAME, ENV_DOWNLOAD_DIR, ENV_ROOT,
    LINK_FALLBACK_COLUMN, LOG_DIR_NAME, MASTER_DIR_NAME, MASTER_WORKBOOK_NAME, STAFF_OUTPUT,
    TRAINING_OUTPUT, patterns,
};
use crate::error::{Result, XaurumError};
use crate::models::DatasetKind;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Output file per dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOutputs {
    pub staff: PathBuf,
    pub certificates: PathBuf,
    pub competences: PathBuf,
    pub training: PathBuf,
    pub cert_results: PathBuf,
}

/// Input glob patterns per fetched dataset, without extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPatterns {
    pub certificates: Vec<String>,
    pub competences: Vec<String>,
    pub training: Vec<String>,
    pub cert_results: Vec<String>,
}

impl Default for DatasetPatterns {
    fn default() -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            certificates: owned(patterns::CERTIFICATES),
            competences: owned(patterns::COMPETENCES),
            training: owned(patterns::TRAINING),
            cert_results: owned(patterns::CERT_RESULTS),
        }
    }
}

/// Configuration for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Tool root holding downloads, logs and the master workbook
    pub root: PathBuf,

    /// Directory searched for fetched exports
    pub input_dir: PathBuf,

    /// Directory receiving run logs
    pub log_dir: PathBuf,

    /// Master workbook carrying the Staff query
    pub master_workbook: PathBuf,

    pub outputs: DatasetOutputs,

    pub patterns: DatasetPatterns,

    /// Headless office binary used for refresh and fallback conversion
    pub office_binary: PathBuf,

    /// Bound on one external application call, in seconds
    pub external_timeout_secs: u64,

    /// Column probed for a download link when no header names one
    pub link_fallback_column: u32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self::from_root(Self::default_root())
    }
}

impl ConverterConfig {
    /// Layout derived from a tool root. Outputs live next to the root.
    pub fn from_root(root: PathBuf) -> Self {
        let output_base = root
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.clone());
        let output = |(dir, file): (&str, &str)| output_base.join(dir).join(file);

        Self {
            input_dir: root.join(DOWNLOAD_DIR_NAME),
            log_dir: root.join(LOG_DIR_NAME),
            master_workbook: root.join(MASTER_DIR_NAME).join(MASTER_WORKBOOK_NAME),
            outputs: DatasetOutputs {
                staff: output(STAFF_OUTPUT),
                certificates: output(CERTIFICATES_OUTPUT),
                competences: output(COMPETENCES_OUTPUT),
                training: output(TRAINING_OUTPUT),
                cert_results: output(CERT_RESULTS_OUTPUT),
            },
            patterns: DatasetPatterns::default(),
            office_binary: PathBuf::from(DEFAULT_OFFICE_BINARY),
            external_timeout_secs: DEFAULT_EXTERNAL_TIMEOUT_SECS,
            link_fallback_column: LINK_FALLBACK_COLUMN,
            root,
        }
    }

    /// `XAURUM_ROOT`, else the documents folder, else the working directory
    pub fn default_root() -> PathBuf {
        if let Some(root) = std::env::var_os(ENV_ROOT).filter(|v| !v.is_empty()) {
            return PathBuf::from(root);
        }
        dirs::document_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_ROOT_DIR_NAME)
    }

    /// Apply `XAURUM_DOWNLOAD_DIR`
    pub fn apply_env(self) -> Self {
        self.with_download_override(std::env::var_os(ENV_DOWNLOAD_DIR))
    }

    fn with_download_override(mut self, value: Option<OsString>) -> Self {
        if let Some(dir) = value.filter(|v| !v.is_empty()) {
            debug!("Input directory overridden by {}", ENV_DOWNLOAD_DIR);
            self.input_dir = PathBuf::from(dir);
        }
        self
    }

    /// Apply overrides from a TOML file
    pub fn load_file(self, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            XaurumError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|e| {
            XaurumError::configuration(format!("invalid {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(file.apply(self))
    }

    /// Set the input directory
    pub fn with_input_dir(mut self, input_dir: PathBuf) -> Self {
        self.input_dir = input_dir;
        self
    }

    /// Set the log directory
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = log_dir;
        self
    }

    /// Set the master workbook
    pub fn with_master_workbook(mut self, master_workbook: PathBuf) -> Self {
        self.master_workbook = master_workbook;
        self
    }

    /// Set one dataset's output file
    pub fn with_output(mut self, kind: DatasetKind, path: PathBuf) -> Self {
        match kind {
            DatasetKind::Staff => self.outputs.staff = path,
            DatasetKind::Certificates => self.outputs.certificates = path,
            DatasetKind::Competences => self.outputs.competences = path,
            DatasetKind::Training => self.outputs.training = path,
            DatasetKind::CertResults => self.outputs.cert_results = path,
        }
        self
    }

    /// Set one fetched dataset's input patterns
    pub fn with_patterns(mut self, kind: DatasetKind, values: Vec<String>) -> Self {
        match kind {
            DatasetKind::Staff => {}
            DatasetKind::Certificates => self.patterns.certificates = values,
            DatasetKind::Competences => self.patterns.competences = values,
            DatasetKind::Training => self.patterns.training = values,
            DatasetKind::CertResults => self.patterns.cert_results = values,
        }
        self
    }

    pub fn with_office_binary(mut self, binary: PathBuf) -> Self {
        self.office_binary = binary;
        self
    }

    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout_secs = timeout.as_secs();
        self
    }

    pub fn output_path(&self, kind: DatasetKind) -> &Path {
        match kind {
            DatasetKind::Staff => &self.outputs.staff,
            DatasetKind::Certificates => &self.outputs.certificates,
            DatasetKind::Competences => &self.outputs.competences,
            DatasetKind::Training => &self.outputs.training,
            DatasetKind::CertResults => &self.outputs.cert_results,
        }
    }

    /// Input patterns; Staff has none
    pub fn patterns_for(&self, kind: DatasetKind) -> &[String] {
        match kind {
            DatasetKind::Staff => &[],
            DatasetKind::Certificates => &self.patterns.certificates,
            DatasetKind::Competences => &self.patterns.competences,
            DatasetKind::Training => &self.patterns.training,
            DatasetKind::CertResults => &self.patterns.cert_results,
        }
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs)
    }

    /// Create the input, log and output directories
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.input_dir)?;
        fs::create_dir_all(&self.log_dir)?;
        for kind in DatasetKind::ALL {
            if let Some(parent) = self.output_path(kind).parent() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for kind in DatasetKind::CONVERTED {
            let patterns = self.patterns_for(kind);
            if patterns.is_empty() || patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(XaurumError::configuration(format!(
                    "{} needs at least one non-empty input pattern",
                    kind
                )));
            }
        }
        if self.external_timeout_secs == 0 {
            return Err(XaurumError::configuration(
                "external_timeout_secs must be greater than zero",
            ));
        }
        if self.link_fallback_column == 0 {
            return Err(XaurumError::configuration(
                "link_fallback_column is 1-based and cannot be zero",
            ));
        }
        Ok(())
    }
}

/// TOML overrides; absent keys keep the current value
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    input_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    master_workbook: Option<PathBuf>,
    office_binary: Option<PathBuf>,
    external_timeout_secs: Option<u64>,
    link_fallback_column: Option<u32>,
    outputs: OutputOverrides,
    patterns: PatternOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OutputOverrides {
    staff: Option<PathBuf>,
    certificates: Option<PathBuf>,
    competences: Option<PathBuf>,
    training: Option<PathBuf>,
    cert_results: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PatternOverrides {
    certificates: Option<Vec<String>>,
    competences: Option<Vec<String>>,
    training: Option<Vec<String>>,
    cert_results: Option<Vec<String>>,
}

impl ConfigFile {
    fn apply(self, mut config: ConverterConfig) -> ConverterConfig {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut config.input_dir, self.input_dir);
        set(&mut config.log_dir, self.log_dir);
        set(&mut config.master_workbook, self.master_workbook);
        set(&mut config.office_binary, self.office_binary);
        set(&mut config.external_timeout_secs, self.external_timeout_secs);
        set(&mut config.link_fallback_column, self.link_fallback_column);

        set(&mut config.outputs.staff, self.outputs.staff);
        set(&mut config.outputs.certificates, self.outputs.certificates);
        set(&mut config.outputs.competences, self.outputs.competences);
        set(&mut config.outputs.training, self.outputs.training);
        set(&mut config.outputs.cert_results, self.outputs.cert_results);

        set(&mut config.patterns.certificates, self.patterns.certificates);
        set(&mut config.patterns.competences, self.patterns.competences);
        set(&mut config.patterns.training, self.patterns.training);
        set(&mut config.patterns.cert_results, self.patterns.cert_results);
        config
    }
}
