//! Format normalization.
//!
//! Brings every input workbook into the canonical `.xlsx` container before
//! header resolution. Conversion is cache-aware: an up-to-date `.xlsx`
//! sibling is reused. Strategies are tried in order and the first one that
//! produces a non-empty file wins.

pub mod native;
pub mod office;

use self::native::NativeConversion;
use self::office::{ApplicationLauncher, ExternalConversion};

use crate::constants::CANONICAL_EXTENSION;
use crate::error::{Result, XaurumError};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One way of turning a workbook into `.xlsx`
pub trait ConversionStrategy: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Write `source` as an `.xlsx` workbook at `target`
    fn convert(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Whether a path already names the canonical format
pub fn is_canonical(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CANONICAL_EXTENSION))
}

/// Converts legacy workbooks to `.xlsx`
#[derive(Debug)]
pub struct FormatNormalizer {
    strategies: Vec<Box<dyn ConversionStrategy>>,
}

impl FormatNormalizer {
    /// Native conversion first, then the external application
    pub fn new(launcher: Arc<dyn ApplicationLauncher>) -> Self {
        Self::with_strategies(vec![
            Box::new(NativeConversion),
            Box::new(ExternalConversion::new(launcher)),
        ])
    }

    /// Native conversion only
    pub fn native_only() -> Self {
        Self::with_strategies(vec![Box::new(NativeConversion)])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ConversionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Path of an `.xlsx` version of `source`, converting when needed
    pub fn ensure_canonical(&self, source: &Path) -> Result<PathBuf> {
        if is_canonical(source) {
            return Ok(source.to_path_buf());
        }

        let target = source.with_extension(CANONICAL_EXTENSION);
        if target.exists() {
            if is_up_to_date(&target, source) {
                info!("Reusing converted workbook {}", target.display());
                return Ok(target);
            }
            debug!("Removing stale conversion {}", target.display());
            discard(&target);
        }

        for strategy in &self.strategies {
            info!(
                "Converting {} with {} conversion",
                source.display(),
                strategy.name()
            );
            match strategy.convert(source, &target) {
                Ok(()) if is_non_empty(&target) => {
                    info!("Converted {} -> {}", source.display(), target.display());
                    return Ok(target);
                }
                Ok(()) => warn!("{} conversion produced no output", strategy.name()),
                Err(e) => {
                    warn!("{} conversion failed: {}", strategy.name(), e);
                    debug!("{} conversion error detail: {:?}", strategy.name(), e);
                }
            }
            if target.exists() {
                discard(&target);
            }
        }

        Err(XaurumError::conversion(
            source,
            format!(
                "no conversion strategy produced a workbook (tried: {})",
                self.strategy_names().join(", ")
            ),
        ))
    }
}

fn modified(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Target at least as new as the source
fn is_up_to_date(target: &Path, source: &Path) -> bool {
    match (modified(target), modified(source)) {
        (Some(target_time), Some(source_time)) => target_time >= source_time,
        _ => false,
    }
}

/// Remove a stale or partial conversion, `false` when it could not be removed
fn discard(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}

fn is_non_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
