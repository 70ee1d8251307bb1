//! Command implementation for the Xaurum converter CLI
//!
//! Layers the configuration, installs logging, wires the pipeline
//! collaborators and prints the operator-facing summary.

use crate::cli::args::Args;
use crate::config::ConverterConfig;
use crate::convert::FormatNormalizer;
use crate::convert::office::{ApplicationLauncher, HeadlessOfficeLauncher};
use crate::error::Result;
use crate::models::{DatasetKind, DatasetOutcome, RunReport};
use crate::processor::Pipeline;
use crate::processor::staff::{ExistingStaffFile, MasterWorkbookRefresh, StaffRefresher};
use anyhow::Context;
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Workbooks found in one output folder
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFolder {
    pub kind: DatasetKind,
    pub folder: PathBuf,
    pub files: Vec<(String, u64)>,
}

/// Run one conversion pass, or list the outputs when asked to
pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args).context("Failed to load configuration")?;
    config
        .ensure_dirs()
        .context("Failed to create output directories")?;

    if args.list_outputs {
        print_output_overview(&output_overview(&config));
        return Ok(());
    }

    let log_file = setup_logging(&args, &config.log_dir).context("Failed to set up logging")?;
    println!("{} {}", "Log file:".bright_cyan(), log_file.display());
    info!("Starting Xaurum converter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", args);
    debug!("Loaded configuration: {:?}", config);

    let launcher: Arc<dyn ApplicationLauncher> = Arc::new(HeadlessOfficeLauncher::new(
        config.office_binary.clone(),
        config.external_timeout(),
    ));
    let refresher = build_refresher(&args, &config, Arc::clone(&launcher));
    let normalizer = FormatNormalizer::new(launcher);
    debug!("Conversion strategies: {:?}", normalizer.strategy_names());

    let pipeline = Pipeline::new(Arc::new(config), refresher, Arc::new(normalizer));

    let progress_bar = if args.show_progress(std::io::stderr().is_terminal()) {
        Some(progress_bar(DatasetKind::ALL.len() as u64))
    } else {
        None
    };

    let report = pipeline.run(progress_bar.as_ref()).await;

    if let Some(pb) = &progress_bar {
        pb.finish_with_message("Conversion complete");
    }

    print_report(&report);
    print_output_overview(&output_overview(pipeline.config()));
    println!("\n{} {}", "Log file:".bright_cyan(), log_file.display());
    Ok(())
}

/// Layer the configuration: root defaults, environment, TOML file, flags
pub fn load_config(args: &Args) -> Result<ConverterConfig> {
    let root = args.root.clone().unwrap_or_else(ConverterConfig::default_root);
    let mut config = ConverterConfig::from_root(root).apply_env();

    if let Some(path) = &args.config_file {
        config = config.load_file(path)?;
    }
    if let Some(input_dir) = &args.input_dir {
        config = config.with_input_dir(input_dir.clone());
    }
    if let Some(master) = &args.master_workbook {
        config = config.with_master_workbook(master.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Install the console and log file subscribers; returns the log file path
pub fn setup_logging(args: &Args, log_dir: &Path) -> anyhow::Result<PathBuf> {
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Cannot create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join(log_file_name(chrono::Local::now()));
    let file = File::create(&log_path)
        .with_context(|| format!("Cannot create log file {}", log_path.display()))?;

    let log_level = args.log_level();
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xaurum_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact()
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("xaurum_processor=debug")),
        )
        .try_init()
        .context("A global logger is already installed")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(log_path)
}

/// `run_YYYYMMDD_HHMMSS.log`
pub fn log_file_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("run_%Y%m%d_%H%M%S.log").to_string()
}

fn build_refresher(
    args: &Args,
    config: &ConverterConfig,
    launcher: Arc<dyn ApplicationLauncher>,
) -> Arc<dyn StaffRefresher> {
    if args.skip_refresh {
        info!("Staff refresh skipped; using the existing Staff file");
        Arc::new(ExistingStaffFile)
    } else {
        Arc::new(MasterWorkbookRefresh::new(
            config.master_workbook.clone(),
            Some(launcher),
        ))
    }
}

fn progress_bar(steps: u64) -> ProgressBar {
    let pb = ProgressBar::new(steps);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("Initializing...");
    pb
}

/// Per-dataset outcome table
pub fn print_report(report: &RunReport) {
    println!("\n{}", "Conversion Summary".bright_green().bold());
    println!("{}", "==================".bright_green());

    for dataset in &report.datasets {
        let label = format!("{:<24}", dataset.kind.label());
        match &dataset.outcome {
            DatasetOutcome::Written { path, summary } => {
                println!(
                    "  {} {} {} rows -> {}",
                    "✓".bright_green(),
                    label,
                    summary.rows_written.to_string().bright_white().bold(),
                    path.display()
                );
                if summary.duplicates_removed > 0 {
                    println!(
                        "      {} duplicates removed",
                        summary.duplicates_removed.to_string().yellow()
                    );
                }
            }
            DatasetOutcome::Skipped { reason } => {
                println!("  {} {} skipped: {}", "✗".bright_red(), label, reason.dimmed());
            }
        }
    }

    println!(
        "\n  {} {} written, {} skipped in {}",
        "Datasets:".bright_cyan(),
        report.written().to_string().bright_green(),
        report.skipped().to_string().bright_red(),
        HumanDuration(report.processing_time)
    );
    println!(
        "  {} {} staff entries, {} unmatched GIDs",
        "Lookup:".bright_cyan(),
        report.lookup_entries,
        report.lookup_misses()
    );
}

/// `.xlsx` files directly inside each output folder
pub fn output_overview(config: &ConverterConfig) -> Vec<OutputFolder> {
    DatasetKind::ALL
        .iter()
        .filter_map(|kind| {
            let folder = config.output_path(*kind).parent()?.to_path_buf();
            let mut files: Vec<(String, u64)> = WalkDir::new(&folder)
                .max_depth(1)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
                })
                .map(|entry| {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    (entry.file_name().to_string_lossy().into_owned(), size)
                })
                .collect();
            files.sort();
            Some(OutputFolder {
                kind: *kind,
                folder,
                files,
            })
        })
        .collect()
}

pub fn print_output_overview(folders: &[OutputFolder]) {
    println!("\n{}", "Output folders:".bright_cyan());
    for folder in folders {
        println!("  {} {}", format!("{}:", folder.kind).bright_yellow(), folder.folder.display());
        if folder.files.is_empty() {
            println!("      {}", "(no workbooks)".dimmed());
        }
        for (name, size) in &folder.files {
            println!("      {} ({})", name, format_size(*size));
        }
    }
}

/// Format a size in bytes in human-readable form
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XaurumError;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_log_file_name() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 3, 4, 7, 8, 9).unwrap();
        assert_eq!(log_file_name(now), "run_20250304_070809.log");
    }

    #[test]
    fn test_load_config_flag_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("XaurumTools");
        let args = Args {
            root: Some(root.clone()),
            input_dir: Some(temp_dir.path().join("elsewhere")),
            master_workbook: Some(temp_dir.path().join("master.xlsx")),
            ..Default::default()
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config.root, root);
        assert_eq!(config.master_workbook, temp_dir.path().join("master.xlsx"));
        // XAURUM_DOWNLOAD_DIR may be set in the environment; the flag still wins
        assert_eq!(config.input_dir, temp_dir.path().join("elsewhere"));
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("converter.toml");
        fs::write(&file, "external_timeout_secs = 0\n").unwrap();
        let args = Args {
            root: Some(temp_dir.path().join("XaurumTools")),
            config_file: Some(file),
            ..Default::default()
        };

        assert!(matches!(
            load_config(&args),
            Err(XaurumError::Configuration { .. })
        ));
    }

    #[test]
    fn test_output_overview_lists_workbooks_only() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConverterConfig::from_root(temp_dir.path().join("XaurumTools"));
        config.ensure_dirs().unwrap();

        let certificates = config.output_path(DatasetKind::Certificates);
        fs::write(certificates, vec![0u8; 2048]).unwrap();
        let folder = certificates.parent().unwrap();
        fs::write(folder.join("notes.txt"), b"ignored").unwrap();
        fs::create_dir_all(folder.join("archive")).unwrap();
        fs::write(folder.join("archive").join("old.xlsx"), b"nested").unwrap();

        let overview = output_overview(&config);
        assert_eq!(overview.len(), DatasetKind::ALL.len());

        let entry = overview
            .iter()
            .find(|folder| folder.kind == DatasetKind::Certificates)
            .unwrap();
        assert_eq!(
            entry.files,
            vec![("Certificates_Overview_ready.xlsx".to_string(), 2048)]
        );
        let staff = overview
            .iter()
            .find(|folder| folder.kind == DatasetKind::Staff)
            .unwrap();
        assert!(staff.files.is_empty());
    }
}
