//! Filesystem utilities for assembling the container tree.

use crate::error::{describe, IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Recursively copy the contents of `src` into `dst`, overwriting on collision.
///
/// Merging semantics:
/// - `dst` is created if it doesn't exist
/// - existing files in `dst` with the same name are replaced (last writer wins)
/// - an existing entry of a different kind (file vs. directory) is removed first
/// - symbolic links are preserved, not followed
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst).io_context(|| describe("creating directory", dst))?;
    }

    for entry in fs::read_dir(src).io_context(|| describe("reading directory", src))? {
        let entry = entry.io_context(|| describe("reading entry in", src))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let file_type = entry
            .file_type()
            .io_context(|| describe("reading file type of", &src_path))?;

        if file_type.is_symlink() {
            let target =
                fs::read_link(&src_path).io_context(|| describe("reading link", &src_path))?;
            remove_existing(&dst_path)?;
            std::os::unix::fs::symlink(&target, &dst_path)
                .io_context(|| describe("creating symlink", &dst_path))?;
        } else if file_type.is_dir() {
            if dst_path.is_file() || dst_path.is_symlink() {
                remove_existing(&dst_path)?;
            }
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            if dst_path.is_dir() && !dst_path.is_symlink() {
                remove_existing(&dst_path)?;
            }
            fs::copy(&src_path, &dst_path).io_context(|| {
                format!(
                    "copying '{}' to '{}'",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }

    Ok(())
}

fn remove_existing(path: &Path) -> Result<()> {
    if path.is_symlink() || path.is_file() {
        fs::remove_file(path).io_context(|| describe("removing", path))?;
    } else if path.is_dir() {
        fs::remove_dir_all(path).io_context(|| describe("removing", path))?;
    }
    Ok(())
}

/// Join `name` onto `parent`, creating the directory if it is absent.
pub fn join_mkdir(parent: &Path, name: &str) -> Result<PathBuf> {
    let path = parent.join(name);
    if !path.exists() {
        fs::create_dir(&path).io_context(|| describe("creating directory", &path))?;
    }
    Ok(path)
}

/// First child directory of `dir`, by name.
///
/// Sorting makes the choice independent of the host's directory listing order.
pub fn first_child_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).io_context(|| describe("reading directory", dir))? {
        let entry = entry.io_context(|| describe("reading entry in", dir))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs.into_iter().next())
}

/// Whether the extension of `path` equals `ext`, ignoring ASCII case.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
