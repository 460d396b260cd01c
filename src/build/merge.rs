//! Merging unpacked volume roots into one tree.

use crate::artifact::filesystem::{copy_dir_recursive, has_extension};
use crate::error::{describe, HdfError, IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of bookkeeping files `xdftool unpack` leaves beside the tree.
pub const SIDECAR_EXTENSIONS: &[&str] = &["xdfmeta", "blkdev"];

/// Name of the command directory at a volume root.
pub const COMMAND_DIR: &str = "c";

/// Name of the script directory at a volume root.
pub const SCRIPT_DIR: &str = "s";

/// Copy each volume root into `target_dir` in order, then delete the root.
///
/// Later roots overwrite files of the same name from earlier ones. There is
/// no rollback: a failure part way leaves `target_dir` partially merged.
pub fn merge_volumes(volume_roots: &[PathBuf], target_dir: &Path) -> Result<()> {
    for root in volume_roots {
        log::info!(
            "merging '{}' into '{}'",
            root.display(),
            target_dir.display()
        );
        copy_dir_recursive(root, target_dir)?;
        fs::remove_dir_all(root).io_context(|| describe("removing merged volume root", root))?;
    }
    Ok(())
}

/// Delete every sidecar metadata file under `dir`. Returns the removed paths.
pub fn strip_sidecars(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|err| {
            let context = describe("scanning for sidecar files in", dir);
            match err.into_io_error() {
                Some(source) => HdfError::Io { context, source },
                None => HdfError::integrity(dir, "filesystem loop detected"),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if SIDECAR_EXTENSIONS.iter().any(|ext| has_extension(path, ext)) {
            removed.push(path.to_path_buf());
        }
    }
    for path in &removed {
        log::debug!("removing sidecar '{}'", path.display());
        fs::remove_file(path).io_context(|| describe("removing sidecar", path))?;
    }
    Ok(removed)
}

/// Merge volume roots into `target_dir` and strip sidecar files from the result.
pub fn merge(volume_roots: &[PathBuf], target_dir: &Path) -> Result<()> {
    merge_volumes(volume_roots, target_dir)?;
    let removed = strip_sidecars(target_dir)?;
    if !removed.is_empty() {
        log::info!("removed {} sidecar file(s)", removed.len());
    }
    Ok(())
}

/// Copy the command directory of a nested tree up to the container root.
///
/// Commands merged into a subdirectory are invisible to the boot shell,
/// which only searches the root `c` directory. Returns whether anything was
/// promoted.
pub fn promote_command_dir(nested_root: &Path, container_root: &Path) -> Result<bool> {
    let nested = nested_root.join(COMMAND_DIR);
    if !nested.is_dir() {
        return Ok(false);
    }
    let root_cdir = container_root.join(COMMAND_DIR);
    log::info!(
        "promoting '{}' to '{}'",
        nested.display(),
        root_cdir.display()
    );
    copy_dir_recursive(&nested, &root_cdir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn volume(base: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = base.join(name);
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        root
    }

    #[test]
    fn test_merge_later_volume_wins() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("merged");
        fs::create_dir(&target).unwrap();
        let a = volume(&target, "A", &[("s/startup-sequence", "a"), ("libs/a", "a")]);
        let b = volume(&target, "B", &[("s/startup-sequence", "b"), ("libs/b", "b")]);

        merge(&[a.clone(), b.clone()], &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("s/startup-sequence")).unwrap(), "b");
        assert!(target.join("libs/a").exists());
        assert!(target.join("libs/b").exists());
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_merge_third_volume_shadows_both() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("merged");
        fs::create_dir(&target).unwrap();
        let a = volume(&target, "A", &[("x", "a"), ("y", "a")]);
        let b = volume(&target, "B", &[("x", "b"), ("y", "b")]);
        merge(&[a, b], &target).unwrap();

        let a = volume(&target, "A", &[("x", "a")]);
        let b = volume(&target, "B", &[("y", "b")]);
        let c = volume(&target, "C", &[("x", "c"), ("y", "c")]);
        merge(&[a, b, c], &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("x")).unwrap(), "c");
        assert_eq!(fs::read_to_string(target.join("y")).unwrap(), "c");
    }

    #[test]
    fn test_strip_sidecars() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("Disk1.xdfmeta"), "").unwrap();
        fs::write(root.join("Disk1.blkdev"), "").unwrap();
        fs::create_dir(root.join("c")).unwrap();
        fs::write(root.join("c/Nested.XDFMETA"), "").unwrap();
        fs::write(root.join("c/List"), "").unwrap();

        let removed = strip_sidecars(root).unwrap();

        assert_eq!(removed.len(), 3);
        assert!(root.join("c/List").exists());
        assert!(!root.join("Disk1.xdfmeta").exists());
        assert!(!root.join("Disk1.blkdev").exists());
        assert!(!root.join("c/Nested.XDFMETA").exists());
    }

    #[test]
    fn test_merge_leaves_no_sidecars() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("merged");
        fs::create_dir(&target).unwrap();
        let a = volume(&target, "Disk1", &[("c/List", "l")]);
        fs::write(target.join("Disk1.xdfmeta"), "meta").unwrap();

        merge(&[a], &target).unwrap();

        let names: Vec<String> = fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["c".to_string()]);
    }

    #[test]
    fn test_merge_missing_root_surfaces_error() {
        let temp = TempDir::new().unwrap();
        let err = merge(&[temp.path().join("nope")], temp.path()).unwrap_err();
        assert!(matches!(err, HdfError::Io { .. }));
    }

    #[test]
    fn test_promote_command_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("Games");
        assert!(!promote_command_dir(&nested, temp.path()).unwrap());

        fs::create_dir_all(nested.join("c")).unwrap();
        fs::write(nested.join("c/Run"), "r").unwrap();
        assert!(promote_command_dir(&nested, temp.path()).unwrap());
        assert!(temp.path().join("c/Run").exists());
        assert!(nested.join("c/Run").exists());
    }
}
