//! Thin builder over `std::process::Command` for single-shot tool invocations.
//!
//! Output is captured in full. A non-zero exit becomes
//! [`HdfError::ExternalTool`].

use crate::error::{HdfError, Result};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Render the command line for logs and error reports.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn run(self) -> Result<CmdOutput> {
        let line = self.display();
        log::debug!("running: {}", line);

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| HdfError::Io {
                context: match source.kind() {
                    io::ErrorKind::NotFound => format!("spawning '{}': program not found", line),
                    _ => format!("spawning '{}'", line),
                },
                source,
            })?;

        let result = CmdOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            return Err(HdfError::ExternalTool {
                command: line,
                status: result.status.to_string(),
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        log::trace!("{} stdout:\n{}", line, result.stdout);
        Ok(result)
    }
}
