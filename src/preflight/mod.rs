//! Preflight checks run before a build touches the filesystem.
//!
//! Validates that the host has the disk image tool installed and that the
//! destination filesystem has room for the container. This prevents a long
//! unpack/merge run from failing at the final pack step.
//!
//! # Example
//!
//! ```rust
//! use hdf_builder::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("xdftool") {
//!     println!("amitools not installed");
//! }
//!
//! let tools = &[("xdftool", "amitools")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use crate::error::{HdfError, IoContext, Result};
use std::path::Path;

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Required host tools for assembling HDF images.
///
/// Each tuple is (command_name, package_name).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[("xdftool", "amitools")];

/// Check that specific tools are available.
///
/// All missing tools are reported at once.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<(&str, &str)> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .copied()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(HdfError::ToolMissing {
        tool: missing
            .iter()
            .map(|(t, _)| *t)
            .collect::<Vec<_>>()
            .join(", "),
        package: missing
            .iter()
            .map(|(_, p)| *p)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Check that all standard tools are available.
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}

/// Ensure the filesystem holding `dir` has at least `required_bytes` free.
pub fn check_available_space(dir: &Path, required_bytes: u64) -> Result<()> {
    let available = fs2::available_space(dir)
        .io_context(|| format!("querying free space of '{}'", dir.display()))?;
    ensure_fits(dir, available, required_bytes)?;
    log::debug!(
        "{} bytes available in '{}', {} bytes required",
        available,
        dir.display(),
        required_bytes
    );
    Ok(())
}

fn ensure_fits(dir: &Path, available_bytes: u64, required_bytes: u64) -> Result<()> {
    if available_bytes < required_bytes {
        return Err(HdfError::InsufficientSpace {
            path: dir.to_path_buf(),
            required_bytes,
            available_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_exists() {
        // 'ls' should exist on any Unix system
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_reports_every_missing_tool() {
        let tools = &[
            ("nonexistent_command_xyz", "fake-package"),
            ("ls", "coreutils"),
            ("nonexistent_command_abc", "other-package"),
        ];
        match check_required_tools(tools).unwrap_err() {
            HdfError::ToolMissing { tool, package } => {
                assert_eq!(tool, "nonexistent_command_xyz, nonexistent_command_abc");
                assert_eq!(package, "fake-package, other-package");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_available_space_small_request() {
        let temp = TempDir::new().unwrap();
        assert!(check_available_space(temp.path(), 0).is_ok());
    }

    #[test]
    fn test_available_space_impossible_request() {
        let temp = TempDir::new().unwrap();
        let err = check_available_space(temp.path(), u64::MAX).unwrap_err();
        assert!(matches!(err, HdfError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_decimal_megabytes_do_not_cover_packed_size() {
        // 13 decimal MB free is short of a 13 MB container packed as size=13Mi.
        let required = crate::artifact::xdftool::pack_size_bytes(13);
        let err = ensure_fits(Path::new("/out"), 13_000_000, required).unwrap_err();
        match err {
            HdfError::InsufficientSpace {
                required_bytes,
                available_bytes,
                ..
            } => {
                assert_eq!(required_bytes, 13_631_488);
                assert_eq!(available_bytes, 13_000_000);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ensure_fits(Path::new("/out"), required, required).is_ok());
    }
}
