//! Executor abstraction for the processing step
//!
//! The processing program itself is an external collaborator: it consumes a
//! staged input directory and must place at least one result file into an
//! output directory before exiting 0. The [`Executor`] trait captures exactly
//! that capability so the step orchestration stays independent of how the
//! executor is hosted (plain process, container runtime, test stub).

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// A processing program bound to an input and an output directory
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the executor against the staged input, writing results into the
    /// output directory
    ///
    /// A non-zero exit is a pipeline failure and must be reported as an
    /// error.
    async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<()>;
}

/// Executor hosted as an external program
///
/// The program is invoked with the input and output directories as its two
/// arguments. The entry point must exist and be executable.
///
/// # Examples
///
/// ```no_run
/// use sensor_relay::CommandExecutor;
/// use std::path::PathBuf;
///
/// // Create with an explicit path
/// let executor = CommandExecutor::new(PathBuf::from("steps/denoise/run"));
///
/// // Or auto-discover from PATH
/// let executor = CommandExecutor::from_path("denoise-step")
///     .expect("denoise-step not found in PATH");
/// ```
pub struct CommandExecutor {
    program: PathBuf,
}

impl CommandExecutor {
    /// Create an executor with an explicit program path
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Attempt to find the named program in PATH
    ///
    /// Returns `Some(CommandExecutor)` if the binary is found, `None`
    /// otherwise.
    pub fn from_path(name: &str) -> Option<Self> {
        which::which(name).ok().map(Self::new)
    }

    fn check_entry_point(&self) -> Result<()> {
        let metadata = std::fs::metadata(&self.program).map_err(|_| {
            Error::Runtime(format!(
                "executor entry point not found: {}",
                self.program.display()
            ))
        })?;
        if !metadata.is_file() {
            return Err(Error::Runtime(format!(
                "executor entry point is not a file: {}",
                self.program.display()
            )));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(Error::Runtime(format!(
                    "executor entry point is not executable: {}",
                    self.program.display()
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<()> {
        self.check_entry_point()?;

        debug!(program = %self.program.display(), ?input_dir, ?output_dir, "running executor");
        let output = Command::new(&self.program)
            .arg(input_dir)
            .arg(output_dir)
            .output()
            .await
            .map_err(|e| {
                Error::Runtime(format!(
                    "failed to execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Runtime(format!(
                "executor {} exited with {:?}: {}",
                self.program.display(),
                output.status.code(),
                stderr.trim()
            )));
        }

        info!(program = %self.program.display(), "executor finished");
        Ok(())
    }
}
