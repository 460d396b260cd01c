//! Scratch directories with guaranteed removal.

use crate::error::{IoContext, Result};
use std::path::Path;
use tempfile::TempDir;

const PREFIX: &str = "hdf-builder-";

/// A process-local temporary directory, removed when dropped.
///
/// Every exit path out of the owning scope (completion, early return, `?`)
/// drops the value and deletes the directory with everything in it.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh empty directory under the system temp location.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .io_context(|| "creating scratch directory")?;
        log::debug!("created scratch directory '{}'", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a fresh empty directory under `parent`.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(parent)
            .io_context(|| format!("creating scratch directory in '{}'", parent.display()))?;
        log::debug!("created scratch directory '{}'", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now and report failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .io_context(|| format!("removing scratch directory '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_removed_on_drop() {
        let path = {
            let scratch = ScratchDir::new().unwrap();
            fs::create_dir(scratch.path().join("Workbench")).unwrap();
            fs::write(scratch.path().join("Workbench/file"), "x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_on_error_path() {
        fn failing(seen: &mut Option<std::path::PathBuf>) -> Result<()> {
            let scratch = ScratchDir::new()?;
            *seen = Some(scratch.path().to_path_buf());
            Err(crate::error::HdfError::integrity(scratch.path(), "boom"))
        }
        let mut seen = None;
        assert!(failing(&mut seen).is_err());
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_new_in_and_close() {
        let parent = tempfile::TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(parent.path()).unwrap();
        assert!(scratch.path().starts_with(parent.path()));
        assert!(fs::read_dir(scratch.path()).unwrap().next().is_none());
        let path = scratch.path().to_path_buf();
        scratch.close().unwrap();
        assert!(!path.exists());
    }
}
