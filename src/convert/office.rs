//! External spreadsheet application, driven out-of-process.
//!
//! [`ApplicationSession`] owns one launched application. Dropping the
//! session closes any open workbook and quits the application, so both are
//! released exactly once on every exit path, unwinding included.
//!
//! The default launcher runs headless LibreOffice with a private profile
//! directory and a bounded wait on each conversion.

use super::ConversionStrategy;
use crate::constants::{
    CANONICAL_EXTENSION, DEFAULT_EXTERNAL_TIMEOUT_SECS, DEFAULT_OFFICE_BINARY,
    EXTERNAL_POLL_INTERVAL_MS,
};
use crate::error::{Result, XaurumError};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Operations the pipeline needs from a spreadsheet application
pub trait SpreadsheetApplication {
    /// Open a workbook, making it the current one
    fn open_workbook(&mut self, path: &Path, read_only: bool) -> Result<()>;

    /// Refresh every query and connection of the current workbook
    fn refresh_all(&mut self) -> Result<()> {
        Ok(())
    }

    /// Save the current workbook as `.xlsx` at `target`
    fn save_as_canonical(&mut self, target: &Path) -> Result<()>;

    fn close_workbook(&mut self) -> Result<()>;

    fn quit(&mut self) -> Result<()>;
}

/// Starts application instances
pub trait ApplicationLauncher: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn launch(&self) -> Result<Box<dyn SpreadsheetApplication>>;
}

/// A launched application, released when dropped
pub struct ApplicationSession {
    name: String,
    application: Option<Box<dyn SpreadsheetApplication>>,
    workbook_open: bool,
}

impl ApplicationSession {
    pub fn start(launcher: &dyn ApplicationLauncher) -> Result<Self> {
        let application = launcher.launch()?;
        debug!("Started {}", launcher.name());
        Ok(Self {
            name: launcher.name().to_string(),
            application: Some(application),
            workbook_open: false,
        })
    }

    fn application(&mut self) -> Result<&mut Box<dyn SpreadsheetApplication>> {
        self.application
            .as_mut()
            .ok_or_else(|| XaurumError::external(&self.name, "application already released"))
    }

    pub fn open(&mut self, path: &Path, read_only: bool) -> Result<()> {
        self.application()?.open_workbook(path, read_only)?;
        self.workbook_open = true;
        Ok(())
    }

    pub fn refresh_all(&mut self) -> Result<()> {
        self.application()?.refresh_all()
    }

    pub fn save_as_canonical(&mut self, target: &Path) -> Result<()> {
        self.application()?.save_as_canonical(target)
    }

    /// Close the workbook and quit now instead of at drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(mut application) = self.application.take() else {
            return;
        };
        if self.workbook_open {
            self.workbook_open = false;
            if let Err(e) = application.close_workbook() {
                debug!("{}: closing workbook failed: {}", self.name, e);
            }
        }
        if let Err(e) = application.quit() {
            warn!("{}: quit failed: {}", self.name, e);
        }
        debug!("Released {}", self.name);
    }
}

impl Drop for ApplicationSession {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Conversion through an external application: open read-only, save as
/// `.xlsx`
#[derive(Debug, Clone)]
pub struct ExternalConversion {
    launcher: Arc<dyn ApplicationLauncher>,
}

impl ExternalConversion {
    pub fn new(launcher: Arc<dyn ApplicationLauncher>) -> Self {
        Self { launcher }
    }
}

impl ConversionStrategy for ExternalConversion {
    fn name(&self) -> &str {
        "external"
    }

    fn convert(&self, source: &Path, target: &Path) -> Result<()> {
        let mut session = ApplicationSession::start(self.launcher.as_ref())?;
        session.open(source, true)?;
        session.save_as_canonical(target)?;
        session.release();
        Ok(())
    }
}

/// Headless LibreOffice (`soffice`)
#[derive(Debug, Clone)]
pub struct HeadlessOfficeLauncher {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for HeadlessOfficeLauncher {
    fn default() -> Self {
        Self::new(
            PathBuf::from(DEFAULT_OFFICE_BINARY),
            Duration::from_secs(DEFAULT_EXTERNAL_TIMEOUT_SECS),
        )
    }
}

impl HeadlessOfficeLauncher {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    /// Full path of the binary, searching `PATH` for bare names
    fn locate(&self) -> Option<PathBuf> {
        if self.binary.components().count() > 1 {
            return self.binary.is_file().then(|| self.binary.clone());
        }
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            let candidate = dir.join(&self.binary);
            if candidate.is_file() {
                return Some(candidate);
            }
            let with_exe = candidate.with_extension("exe");
            with_exe.is_file().then_some(with_exe)
        })
    }
}

impl ApplicationLauncher for HeadlessOfficeLauncher {
    fn name(&self) -> &str {
        "headless office"
    }

    fn launch(&self) -> Result<Box<dyn SpreadsheetApplication>> {
        let binary = self.locate().ok_or_else(|| {
            XaurumError::external(
                self.name(),
                format!("'{}' not found", self.binary.display()),
            )
        })?;
        let profile = TempDir::new()?;
        Ok(Box::new(HeadlessOffice {
            binary,
            timeout: self.timeout,
            profile,
            current: None,
            child: None,
        }))
    }
}

/// One LibreOffice instance with its own user profile
struct HeadlessOffice {
    binary: PathBuf,
    timeout: Duration,
    profile: TempDir,
    current: Option<PathBuf>,
    child: Option<Child>,
}

impl HeadlessOffice {
    const NAME: &'static str = "headless office";

    /// Wait for the running child, killing it past the timeout
    fn wait_for_child(&mut self) -> Result<()> {
        let started = Instant::now();
        loop {
            let Some(child) = self.child.as_mut() else {
                return Ok(());
            };
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return if status.success() {
                    Ok(())
                } else {
                    Err(XaurumError::external(
                        Self::NAME,
                        format!("conversion exited with {}", status),
                    ))
                };
            }
            if started.elapsed() >= self.timeout {
                self.kill_child();
                return Err(XaurumError::external(
                    Self::NAME,
                    format!("conversion timed out after {:?}", self.timeout),
                ));
            }
            thread::sleep(Duration::from_millis(EXTERNAL_POLL_INTERVAL_MS));
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!("Killing office process failed: {}", e);
            }
            if let Err(e) = child.wait() {
                warn!("Waiting for office process to exit failed: {}", e);
            }
        }
    }
}

impl SpreadsheetApplication for HeadlessOffice {
    fn open_workbook(&mut self, path: &Path, _read_only: bool) -> Result<()> {
        if !path.is_file() {
            return Err(XaurumError::external(
                Self::NAME,
                format!("workbook not found: {}", path.display()),
            ));
        }
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn refresh_all(&mut self) -> Result<()> {
        debug!("Headless office keeps cached query results; refresh is a no-op");
        Ok(())
    }

    fn save_as_canonical(&mut self, target: &Path) -> Result<()> {
        let source = self
            .current
            .clone()
            .ok_or_else(|| XaurumError::external(Self::NAME, "no workbook open"))?;
        let out_dir = self.profile.path().join("out");
        fs::create_dir_all(&out_dir)?;

        let child = Command::new(&self.binary)
            .arg(format!(
                "-env:UserInstallation={}",
                file_url(&self.profile.path().join("user"))
            ))
            .args(["--headless", "--norestore", "--nologo", "--convert-to"])
            .arg(CANONICAL_EXTENSION)
            .arg("--outdir")
            .arg(&out_dir)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| XaurumError::external(Self::NAME, format!("spawn failed: {}", e)))?;
        self.child = Some(child);
        self.wait_for_child()?;

        let stem = source
            .file_stem()
            .ok_or_else(|| XaurumError::external(Self::NAME, "source has no file name"))?;
        let produced = out_dir.join(format!(
            "{}.{}",
            stem.to_string_lossy(),
            CANONICAL_EXTENSION
        ));
        if !produced.is_file() {
            return Err(XaurumError::external(
                Self::NAME,
                format!("no output produced for {}", source.display()),
            ));
        }
        fs::copy(&produced, target)?;
        fs::remove_file(&produced)?;
        info!("External conversion wrote {}", target.display());
        Ok(())
    }

    fn close_workbook(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.kill_child();
        Ok(())
    }
}

/// `file://` URL for a local path
fn file_url(path: &Path) -> String {
    let path = path.display().to_string().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
