use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::job::display_command;

/// How the renderer process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the child wrote straight to our stdout/stderr.
    pub streamed: bool,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("renderer executable not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to launch renderer {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("renderer exited with status {0}")]
    Exit(i32),
    #[error("renderer was terminated by a signal")]
    Signal,
}

/// Starts a child process and waits for it.
pub trait Launcher {
    fn launch(&self, program: &Path, args: &[OsString]) -> io::Result<ProcessOutcome>;
}

/// Spawns real processes with inherited stdio so progress shows up live.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, program: &Path, args: &[OsString]) -> io::Result<ProcessOutcome> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(ProcessOutcome {
            exit_code: status.code(),
            streamed: true,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner<L = SystemLauncher> {
    program: PathBuf,
    launcher: L,
}

impl ProcessRunner<SystemLauncher> {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_launcher(program, SystemLauncher)
    }
}

impl<L: Launcher> ProcessRunner<L> {
    pub fn with_launcher(program: impl Into<PathBuf>, launcher: L) -> Self {
        Self {
            program: program.into(),
            launcher,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Rejects an explicit executable path that does not exist.
    ///
    /// Bare command names (no separator) are left for the OS to look up at launch.
    pub fn preflight(&self) -> Result<(), ProcessError> {
        if self.program.components().count() > 1 && !self.program.exists() {
            return Err(ProcessError::NotFound(self.program.clone()));
        }
        Ok(())
    }

    /// Runs the renderer to completion. Any outcome other than exit code 0 is an error.
    pub fn run(&self, args: &[OsString]) -> Result<ProcessOutcome, ProcessError> {
        info!(command = %display_command(&self.program, args), "launching renderer");
        let outcome = self
            .launcher
            .launch(&self.program, args)
            .map_err(|source| ProcessError::Launch {
                program: self.program.clone(),
                source,
            })?;
        debug!(?outcome, "renderer exited");

        match outcome.exit_code {
            Some(0) => Ok(outcome),
            Some(code) => Err(ProcessError::Exit(code)),
            None => Err(ProcessError::Signal),
        }
    }
}
