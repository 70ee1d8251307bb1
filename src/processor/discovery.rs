//! Input discovery
//!
//! Finds the newest export per dataset in the input directory. Each glob
//! pattern is tried with every supported spreadsheet extension; the most
//! recently modified match across all of them wins.

use crate::constants::INPUT_EXTENSIONS;
use crate::error::Result;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Input discovery for one input directory
#[derive(Debug, Clone)]
pub struct InputDiscovery {
    input_dir: PathBuf,
}

impl InputDiscovery {
    pub fn new(input_dir: PathBuf) -> Self {
        Self { input_dir }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Every file matching one of `patterns`, deduplicated
    pub fn candidates(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let base = Pattern::escape(&self.input_dir.to_string_lossy());

        let mut files = Vec::new();
        for pattern in patterns {
            for extension in INPUT_EXTENSIONS {
                let full = format!("{}/{}.{}", base, pattern, extension);
                for entry in glob::glob_with(&full, options)? {
                    match entry {
                        Ok(path) if path.is_file() && !files.contains(&path) => files.push(path),
                        Ok(_) => {}
                        Err(e) => debug!("Skipping unreadable match: {}", e),
                    }
                }
            }
        }
        Ok(files)
    }

    /// The most recently modified match, if any
    pub async fn find_latest(&self, patterns: &[String]) -> Result<Option<PathBuf>> {
        if !self.input_dir.exists() {
            debug!("Input directory does not exist: {}", self.input_dir.display());
            return Ok(None);
        }

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for path in self.candidates(patterns)? {
            let modified = fs::metadata(&path).await?.modified()?;
            let newer = latest
                .as_ref()
                .is_none_or(|(best, _)| modified > *best);
            if newer {
                latest = Some((modified, path));
            }
        }

        if let Some((_, path)) = &latest {
            debug!("Latest match for {:?}: {}", patterns, path.display());
        }
        Ok(latest.map(|(_, path)| path))
    }
}
