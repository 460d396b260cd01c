//! Error taxonomy for the HDF assembly pipeline.
//!
//! Every variant is fatal to a run. Nothing is retried; each variant carries
//! the path or command line needed to diagnose the failure.

use std::io;
use std::path::{Path, PathBuf};

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, HdfError>;

#[derive(thiserror::Error, Debug)]
pub enum HdfError {
    /// A required input path does not exist.
    #[error("{what} not found: '{}'", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The destination container is already present.
    #[error("destination already exists: '{}'", .path.display())]
    AlreadyExists { path: PathBuf },

    /// The disk image tool reported success but its output is not what we expected.
    #[error("integrity check failed for '{}': {message}", .path.display())]
    Integrity { path: PathBuf, message: String },

    /// A command listed for injection is absent from the commands volume.
    #[error("command '{name}' missing from commands volume (expected '{}')", .path.display())]
    MissingCommand { name: String, path: PathBuf },

    /// An external process exited with a non-zero status.
    #[error("'{command}' failed ({status}): {}", detail(.stdout, .stderr))]
    ExternalTool {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// The external program itself could not be located.
    #[error("required tool '{tool}' not found on PATH (install: {package})")]
    ToolMissing { tool: String, package: String },

    /// Not enough room on the destination filesystem for the container.
    #[error(
        "insufficient space in '{}': need {required_bytes} bytes, {available_bytes} bytes available",
        .path.display()
    )]
    InsufficientSpace {
        path: PathBuf,
        required_bytes: u64,
        available_bytes: u64,
    },

    /// Invalid or unreadable configuration.
    #[error("invalid configuration '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl HdfError {
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        HdfError::NotFound {
            what,
            path: path.into(),
        }
    }

    pub fn integrity(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HdfError::Integrity {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HdfError::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn detail(stdout: &str, stderr: &str) -> String {
    let parts: Vec<&str> = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        "no output".to_string()
    } else {
        parts.join("\n")
    }
}

/// Attach a description to an `io::Error`, in the spirit of `anyhow::Context`.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| HdfError::Io {
            context: f().into(),
            source,
        })
    }
}

/// Shorthand for the common "verb 'path'" context message.
pub(crate) fn describe(verb: &str, path: &Path) -> String {
    format!("{} '{}'", verb, path.display())
}
