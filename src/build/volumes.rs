//! Volume discovery and unpacking.
//!
//! A volume reference is either a single ADF file or a directory holding
//! several. Each volume is unpacked by the disk image tool into a directory
//! named after the volume, which we learn from the tool's listing output.

use crate::artifact::filesystem::has_extension;
use crate::artifact::xdftool::{DiskImageTool, VOLUME_MARKER};
use crate::error::{describe, HdfError, IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of floppy volume files, compared case-insensitively.
pub const VOLUME_EXTENSION: &str = "adf";

/// Resolve a volume reference into the volume files it names.
///
/// A directory yields every file in it with the volume extension, in
/// directory listing order. A file yields itself.
pub fn volume_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(HdfError::not_found("volume reference", path));
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).io_context(|| describe("reading volume directory", path))? {
        let entry = entry.io_context(|| describe("reading entry in", path))?;
        let candidate = entry.path();
        if candidate.is_file() && has_extension(&candidate, VOLUME_EXTENSION) {
            files.push(candidate);
        }
    }
    Ok(files)
}

/// Extract the volume name from disk image tool listing output.
///
/// The name is the text before the first [`VOLUME_MARKER`], trimmed. Output
/// without the marker, or with an empty or multi-line name, is rejected
/// rather than guessed at.
pub fn parse_volume_name(listing: &str, image: &Path) -> Result<String> {
    let Some((head, _)) = listing.split_once(VOLUME_MARKER) else {
        return Err(HdfError::integrity(
            image,
            format!("listing output has no '{}' marker", VOLUME_MARKER),
        ));
    };
    let name = head.trim();
    if name.is_empty() {
        return Err(HdfError::integrity(
            image,
            "listing output has an empty volume name",
        ));
    }
    if name.contains('\n') {
        return Err(HdfError::integrity(
            image,
            format!("unexpected listing output before '{}' marker", VOLUME_MARKER),
        ));
    }
    Ok(name.to_string())
}

/// Ask the tool for the volume name of `image`.
pub fn volume_name(tool: &dyn DiskImageTool, image: &Path) -> Result<String> {
    let listing = tool.list(image)?;
    parse_volume_name(&listing, image)
}

/// Root directories produced by [`unpack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unpacked {
    /// The reference was a single volume file.
    Single(PathBuf),
    /// The reference was a directory; one root per volume in resolution order.
    Many(Vec<PathBuf>),
}

impl Unpacked {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Unpacked::Single(path) => std::slice::from_ref(path),
            Unpacked::Many(paths) => paths,
        }
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            Unpacked::Single(path) => vec![path],
            Unpacked::Many(paths) => paths,
        }
    }
}

/// Unpack every volume named by `volume_ref` into `dest_dir`.
///
/// Creates one directory per volume under `dest_dir` and leaves them there.
pub fn unpack(tool: &dyn DiskImageTool, volume_ref: &Path, dest_dir: &Path) -> Result<Unpacked> {
    if !volume_ref.exists() {
        return Err(HdfError::not_found("volume reference", volume_ref));
    }
    if !dest_dir.is_dir() {
        return Err(HdfError::not_found("unpack directory", dest_dir));
    }
    let dest_dir =
        std::path::absolute(dest_dir).io_context(|| describe("resolving", dest_dir))?;

    let mut roots = Vec::new();
    for file in volume_files(volume_ref)? {
        let name = volume_name(tool, &file)?;
        log::info!("unpacking '{}' (volume '{}')", file.display(), name);
        tool.unpack(&file, &dest_dir)?;

        let root = dest_dir.join(&name);
        if !root.is_dir() {
            return Err(HdfError::integrity(
                &file,
                format!("expected unpacked volume root '{}'", root.display()),
            ));
        }
        roots.push(root);
    }

    if volume_ref.is_dir() {
        Ok(Unpacked::Many(roots))
    } else {
        roots.pop().map(Unpacked::Single).ok_or_else(|| {
            HdfError::integrity(volume_ref, "volume file produced no unpacked root")
        })
    }
}
