//! Command-line argument definitions for the Xaurum converter

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the Xaurum converter
///
/// Converts the spreadsheet exports fetched from Xaurum into the standardized
/// ReadyForFlow workbooks, one named table per dataset.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "xaurum_processor",
    version,
    about = "Convert Xaurum spreadsheet exports into ReadyForFlow Excel tables",
    long_about = "Runs one conversion pass: refreshes the Staff master, then converts the newest \
                  Certificates, Competences, Training and Certification Results exports found in \
                  the download folder into standardized, deduplicated .xlsx tables."
)]
pub struct Args {
    /// Root directory holding downloads/, logs/ and Master/
    ///
    /// Defaults to $XAURUM_ROOT, else Documents/XaurumTools.
    #[arg(long = "root", value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Directory the fetch stage downloads exports into
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input_dir: Option<PathBuf>,

    /// Master workbook whose staff sheet feeds the Staff output
    #[arg(long = "master", value_name = "FILE")]
    pub master_workbook: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Show debug diagnostics on the console
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// List the output folders and their workbooks, then exit
    #[arg(long = "list-outputs")]
    pub list_outputs: bool,

    /// Use the existing Staff file instead of refreshing the master workbook
    #[arg(long = "skip-refresh")]
    pub skip_refresh: bool,
}

impl Args {
    /// Console log level implied by the flags
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// The progress bar is drawn only on an interactive, non-verbose run
    pub fn show_progress(&self, stderr_is_terminal: bool) -> bool {
        stderr_is_terminal && !self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["xaurum_processor"]);
        assert!(args.root.is_none());
        assert!(!args.verbose);
        assert!(!args.skip_refresh);
        assert_eq!(args.log_level(), "info");
    }

    #[test]
    fn test_all_flags() {
        let args = Args::parse_from([
            "xaurum_processor",
            "--root",
            "/data/xaurum",
            "-i",
            "/data/in",
            "--master",
            "/data/master.xlsm",
            "-c",
            "converter.toml",
            "-v",
            "--list-outputs",
            "--skip-refresh",
        ]);
        assert_eq!(args.root, Some(PathBuf::from("/data/xaurum")));
        assert_eq!(args.input_dir, Some(PathBuf::from("/data/in")));
        assert_eq!(args.master_workbook, Some(PathBuf::from("/data/master.xlsm")));
        assert_eq!(args.config_file, Some(PathBuf::from("converter.toml")));
        assert!(args.list_outputs);
        assert!(args.skip_refresh);
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn test_progress_only_when_interactive_and_quiet() {
        let mut args = Args::default();
        assert!(args.show_progress(true));
        assert!(!args.show_progress(false));
        args.verbose = true;
        assert!(!args.show_progress(true));
    }
}
