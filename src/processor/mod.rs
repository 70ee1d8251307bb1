//! Pipeline driver.
//!
//! Runs one conversion pass: Staff refresh and lookup first, then every
//! fetched dataset in turn. Blocking spreadsheet work runs on the blocking
//! pool but datasets are still processed one at a time, and a failure in one
//! dataset is recorded in the report without stopping the others.

pub mod datasets;
pub mod deduplication;
pub mod discovery;
pub mod lookup;
pub mod staff;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::datasets::{RecipeContext, run_recipe};
use self::discovery::InputDiscovery;
use self::lookup::LookupTable;
use self::staff::{RefreshOutcome, StaffRefresher, load_staff};

use crate::config::ConverterConfig;
use crate::convert::FormatNormalizer;
use crate::error::{Result, XaurumError};
use crate::models::{
    DatasetKind, DatasetOutcome, DatasetReport, DatasetSummary, RunReport, StaffRecord,
};

use colored::*;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info, warn};

/// Newest input found per fetched dataset
pub type FoundInputs = Vec<(DatasetKind, Option<PathBuf>)>;

/// One conversion run over all datasets
#[derive(Debug)]
pub struct Pipeline {
    config: Arc<ConverterConfig>,
    refresher: Arc<dyn StaffRefresher>,
    normalizer: Arc<FormatNormalizer>,
    discovery: InputDiscovery,
}

impl Pipeline {
    pub fn new(
        config: Arc<ConverterConfig>,
        refresher: Arc<dyn StaffRefresher>,
        normalizer: Arc<FormatNormalizer>,
    ) -> Self {
        let discovery = InputDiscovery::new(config.input_dir.clone());
        Self {
            config,
            refresher,
            normalizer,
            discovery,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Newest matching export for every fetched dataset
    pub async fn discover_inputs(&self) -> FoundInputs {
        let mut found = Vec::with_capacity(DatasetKind::CONVERTED.len());
        for kind in DatasetKind::CONVERTED {
            let input = match self.discovery.find_latest(self.config.patterns_for(kind)).await {
                Ok(input) => input,
                Err(e) => {
                    error!("Input discovery for {} failed: {:#}", kind, e);
                    None
                }
            };
            found.push((kind, input));
        }
        found
    }

    /// Main processing entry point
    pub async fn run(&self, progress: Option<&ProgressBar>) -> RunReport {
        let start_time = Instant::now();
        announce(
            progress,
            format!("{}", "Starting Xaurum conversion".bright_green().bold()),
        );
        announce(
            progress,
            format!(
                "  {} {}",
                "Input:".bright_cyan(),
                self.config.input_dir.display()
            ),
        );

        let found = self.discover_inputs().await;
        print_found_inputs(progress, &found);

        let total_steps = DatasetKind::ALL.len();
        let mut report = RunReport::default();

        // Step 1: Staff master
        announce_step(progress, 1, total_steps, DatasetKind::Staff);
        let (staff_report, lookup) = self.refresh_staff(progress).await;
        report.lookup_entries = lookup.len();
        report.datasets.push(staff_report);
        advance(progress);

        // Steps 2-5: fetched datasets
        let lookup = Arc::new(lookup);
        for (index, (kind, input)) in found.into_iter().enumerate() {
            announce_step(progress, index + 2, total_steps, kind);
            let dataset_report = self
                .process_dataset(kind, input, Arc::clone(&lookup), progress)
                .await;
            report.datasets.push(dataset_report);
            advance(progress);
        }

        report.processing_time = start_time.elapsed();
        info!(
            "Run finished in {:.1}s: {} written, {} skipped",
            report.processing_time.as_secs_f64(),
            report.written(),
            report.skipped()
        );
        report
    }

    /// Refresh the Staff file and build the GID lookup from it
    async fn refresh_staff(
        &self,
        progress: Option<&ProgressBar>,
    ) -> (DatasetReport, LookupTable) {
        let kind = DatasetKind::Staff;
        let target = self.config.output_path(kind).to_path_buf();

        let refresher = Arc::clone(&self.refresher);
        let refresh_target = target.clone();
        let refreshed = task::spawn_blocking(move || refresher.refresh(&refresh_target))
            .await
            .map_err(XaurumError::from)
            .and_then(|outcome| outcome);

        let loaded = self.load_lookup(&target).await;
        let lookup = match &loaded {
            Ok(records) => LookupTable::from_staff(records),
            Err(_) => LookupTable::default(),
        };

        let outcome = match refreshed {
            Ok(RefreshOutcome::Refreshed { rows }) => {
                announce(
                    progress,
                    format!(
                        "  {} Staff exported ({} rows)",
                        "✓".bright_green(),
                        rows.to_string().bright_white().bold()
                    ),
                );
                written(&target, rows)
            }
            Ok(RefreshOutcome::Reused) => match loaded {
                Ok(records) => written(&target, records.len()),
                Err(e) => DatasetOutcome::Skipped {
                    reason: format!("Staff file unreadable: {}", e),
                },
            },
            Ok(RefreshOutcome::Unavailable { reason }) => {
                warn!("Staff refresh unavailable: {}", reason);
                DatasetOutcome::Skipped { reason }
            }
            Err(e) => {
                error!("Staff refresh failed: {:#}", e);
                debug!("Staff refresh error detail: {:?}", e);
                DatasetOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        let report = DatasetReport {
            kind,
            input: None,
            outcome,
        };
        (report, lookup)
    }

    /// Staff records for the lookup; an error leaves the lookup empty
    async fn load_lookup(&self, target: &Path) -> Result<Vec<StaffRecord>> {
        if !target.is_file() {
            warn!(
                "Staff file not found for lookup: {}; staffSAPNR lookups will be empty",
                target.display()
            );
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no Staff file at {}", target.display()),
            )
            .into());
        }
        let path = target.to_path_buf();
        let loaded = task::spawn_blocking(move || load_staff(&path))
            .await
            .map_err(XaurumError::from)
            .and_then(|records| records);
        if let Err(e) = &loaded {
            warn!("Cannot load Staff file for lookup: {}", e);
            debug!("Staff load error detail: {:?}", e);
        }
        loaded
    }

    /// Convert one dataset, recording a failure instead of returning it
    async fn process_dataset(
        &self,
        kind: DatasetKind,
        input: Option<PathBuf>,
        lookup: Arc<LookupTable>,
        progress: Option<&ProgressBar>,
    ) -> DatasetReport {
        let outcome = match &input {
            None => {
                let missing = XaurumError::MissingInput {
                    dataset: kind.label().to_string(),
                    patterns: self.config.patterns_for(kind).join(", "),
                };
                warn!("{}; skipping", missing);
                DatasetOutcome::Skipped {
                    reason: missing.to_string(),
                }
            }
            Some(source) => match self.convert(kind, source.clone(), lookup).await {
                Ok(summary) => {
                    announce(
                        progress,
                        format!(
                            "  {} {} converted ({} rows)",
                            "✓".bright_green(),
                            kind,
                            summary.rows_written.to_string().bright_white().bold()
                        ),
                    );
                    DatasetOutcome::Written {
                        path: self.config.output_path(kind).to_path_buf(),
                        summary,
                    }
                }
                Err(e) => {
                    error!("{} conversion failed for {}: {:#}", kind, source.display(), e);
                    debug!("{} conversion error detail: {:?}", kind, e);
                    announce(
                        progress,
                        format!(
                            "  {} {} conversion failed; see the log for details",
                            "✗".bright_red(),
                            kind
                        ),
                    );
                    DatasetOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
            },
        };

        DatasetReport {
            kind,
            input,
            outcome,
        }
    }

    async fn convert(
        &self,
        kind: DatasetKind,
        source: PathBuf,
        lookup: Arc<LookupTable>,
    ) -> Result<DatasetSummary> {
        let normalizer = Arc::clone(&self.normalizer);
        let output = self.config.output_path(kind).to_path_buf();
        let link_fallback_column = self.config.link_fallback_column;

        task::spawn_blocking(move || {
            let canonical = normalizer.ensure_canonical(&source)?;
            let context = RecipeContext {
                lookup: &lookup,
                link_fallback_column,
            };
            run_recipe(kind, &canonical, &output, context)
        })
        .await?
    }
}

fn written(path: &Path, rows: usize) -> DatasetOutcome {
    DatasetOutcome::Written {
        path: path.to_path_buf(),
        summary: DatasetSummary {
            rows_read: rows,
            rows_written: rows,
            ..Default::default()
        },
    }
}

/// Print above the progress bar when there is one
fn announce(progress: Option<&ProgressBar>, line: String) {
    match progress {
        Some(pb) => pb.println(line),
        None => println!("{}", line),
    }
}

fn announce_step(progress: Option<&ProgressBar>, step: usize, total: usize, kind: DatasetKind) {
    if let Some(pb) = progress {
        pb.set_message(kind.label());
    }
    announce(
        progress,
        format!(
            "\n{} {}",
            format!("Step {}/{}:", step, total).bright_yellow(),
            kind
        ),
    );
}

fn advance(progress: Option<&ProgressBar>) {
    if let Some(pb) = progress {
        pb.inc(1);
    }
}

fn print_found_inputs(progress: Option<&ProgressBar>, found: &FoundInputs) {
    announce(progress, format!("\n{}", "Found files:".bright_cyan()));
    for (kind, input) in found {
        let line = match input.as_ref().and_then(|path| path.file_name()) {
            Some(name) => format!(
                "  - {}: {} {}",
                kind,
                "✓".bright_green(),
                name.to_string_lossy()
            ),
            None => format!("  - {}: {}", kind, "not found".bright_red()),
        };
        announce(progress, line);
    }
}
