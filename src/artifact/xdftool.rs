//! Disk image tool seam and its `xdftool` implementation.
//!
//! The pipeline never parses ADF/HDF data itself. Everything that touches
//! image contents goes through [`DiskImageTool`], which the production build
//! backs with amitools' `xdftool`.

use crate::error::Result;
use crate::process::Cmd;
use std::path::{Path, PathBuf};

/// Name of the amitools executable.
pub const XDFTOOL: &str = "xdftool";

/// Marker that follows the volume name in `xdftool list` output.
pub const VOLUME_MARKER: &str = "VOLUME";

/// Primitive operations offered by an external disk image tool.
pub trait DiskImageTool {
    /// Extract the filesystem tree of `image` under `dest_dir`.
    fn unpack(&self, image: &Path, dest_dir: &Path) -> Result<()>;

    /// Build `dest_image` with capacity `size_mb` from the contents of `src_dir`.
    fn pack(&self, src_dir: &Path, dest_image: &Path, size_mb: u64) -> Result<()>;

    /// Free-form listing of the image; contains the volume name before [`VOLUME_MARKER`].
    fn list(&self, image: &Path) -> Result<String>;

    /// Format a fresh bootable floppy image.
    fn format(&self, image: &Path, label: &str) -> Result<()>;

    /// Create and format a fresh bootable hard disk image.
    fn create(&self, image: &Path, label: &str, size_mb: u64) -> Result<()>;
}

impl<T: DiskImageTool + ?Sized> DiskImageTool for &T {
    fn unpack(&self, image: &Path, dest_dir: &Path) -> Result<()> {
        (**self).unpack(image, dest_dir)
    }

    fn pack(&self, src_dir: &Path, dest_image: &Path, size_mb: u64) -> Result<()> {
        (**self).pack(src_dir, dest_image, size_mb)
    }

    fn list(&self, image: &Path) -> Result<String> {
        (**self).list(image)
    }

    fn format(&self, image: &Path, label: &str) -> Result<()> {
        (**self).format(image, label)
    }

    fn create(&self, image: &Path, label: &str, size_mb: u64) -> Result<()> {
        (**self).create(image, label, size_mb)
    }
}

/// `xdftool` from amitools.
///
/// See <http://lallafa.de/blog/amiga-projects/amitools/xdftool>.
#[derive(Debug, Clone)]
pub struct XdfTool {
    program: PathBuf,
}

impl Default for XdfTool {
    fn default() -> Self {
        Self {
            program: PathBuf::from(XDFTOOL),
        }
    }
}

impl XdfTool {
    /// Use a specific executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn cmd(&self, image: &Path) -> Cmd {
        Cmd::new(&self.program).arg_path(image)
    }
}

/// Bytes in the `Mi` unit of [`size_arg`].
pub const MEBIBYTE: u64 = 1_048_576;

/// `size=<n>Mi` argument understood by `xdftool pack` and `create`.
pub fn size_arg(size_mb: u64) -> String {
    format!("size={}Mi", size_mb)
}

/// Bytes allocated for a container passed `size_mb` through [`size_arg`].
///
/// The packer always reads the size as mebibytes, whatever unit the
/// estimate was made in.
pub fn pack_size_bytes(size_mb: u64) -> u64 {
    size_mb.saturating_mul(MEBIBYTE)
}

impl DiskImageTool for XdfTool {
    fn unpack(&self, image: &Path, dest_dir: &Path) -> Result<()> {
        self.cmd(image).arg("unpack").arg_path(dest_dir).run()?;
        Ok(())
    }

    fn pack(&self, src_dir: &Path, dest_image: &Path, size_mb: u64) -> Result<()> {
        self.cmd(dest_image)
            .arg("pack")
            .arg_path(src_dir)
            .arg(size_arg(size_mb))
            .run()?;
        Ok(())
    }

    fn list(&self, image: &Path) -> Result<String> {
        let output = self.cmd(image).arg("list").run()?;
        Ok(output.stdout)
    }

    fn format(&self, image: &Path, label: &str) -> Result<()> {
        self.cmd(image)
            .arg("format")
            .arg(label)
            .args(["+", "boot", "install"])
            .run()?;
        Ok(())
    }

    fn create(&self, image: &Path, label: &str, size_mb: u64) -> Result<()> {
        self.cmd(image)
            .args(["create", "format"])
            .arg(label)
            .arg(size_arg(size_mb))
            .args(["+", "boot", "install"])
            .run()?;
        Ok(())
    }
}

/// Volume label derived from an image file name: stem with the first letter upper-cased.
///
/// `workbench.adf` becomes `Workbench`.
pub fn label_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    capitalize(&stem)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Format a new bootable ADF named `file_name` inside `dest_dir`.
///
/// Without an explicit `label` the volume is named after the file.
pub fn create_adf(
    tool: &dyn DiskImageTool,
    file_name: &str,
    label: Option<&str>,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let image = dest_dir.join(file_name);
    let label = label.map_or_else(|| label_from_filename(&image), str::to_string);
    log::info!("formatting '{}' as '{}'", image.display(), label);
    tool.format(&image, &label)?;
    Ok(image)
}

/// Create a new bootable HDF of `size_mb` named `file_name` inside `dest_dir`.
pub fn create_hdf(
    tool: &dyn DiskImageTool,
    file_name: &str,
    label: Option<&str>,
    size_mb: u64,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let image = dest_dir.join(file_name);
    let label = label.map_or_else(|| label_from_filename(&image), str::to_string);
    log::info!(
        "creating '{}' ({} MB) as '{}'",
        image.display(),
        size_mb,
        label
    );
    tool.create(&image, &label, size_mb)?;
    Ok(image)
}
