//! Container capacity estimation.
//!
//! The container is sized from the bytes actually present in the merged
//! tree, plus a margin of free space, rounded to whole megabytes.

use crate::error::{describe, HdfError, Result};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

/// Bytes per megabyte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    /// 1,000,000 bytes. Never undersizes when the packer reads "MB" as decimal.
    #[default]
    Decimal,
    /// 1,048,576 bytes.
    Binary,
}

impl SizeUnit {
    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::Decimal => 1_000_000,
            SizeUnit::Binary => 1_048_576,
        }
    }
}

/// How an estimate turns into a container size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityPolicy {
    pub unit: SizeUnit,
    /// Free space to leave, as a percentage of the content size.
    pub margin_percent: f64,
    /// Smallest container the packer is asked for.
    pub min_size_mb: u64,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            unit: SizeUnit::Decimal,
            margin_percent: 30.0,
            min_size_mb: 1,
        }
    }
}

impl CapacityPolicy {
    /// Estimate for `size_bytes` of content, without the minimum floor.
    ///
    /// Rounds half away from zero.
    pub fn estimate_mb(&self, size_bytes: u64) -> u64 {
        let mb = size_bytes as f64 / self.unit.bytes() as f64;
        let with_margin = mb * (1.0 + self.margin_percent / 100.0);
        with_margin.round().max(0.0) as u64
    }

    /// Container size for `size_bytes` of content, never below the floor.
    pub fn container_mb(&self, size_bytes: u64) -> u64 {
        self.estimate_mb(size_bytes).max(self.min_size_mb)
    }
}

/// Sum of the sizes of all regular files under `root`.
pub fn total_size_bytes(root: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| {
            let context = describe("measuring", root);
            match err.into_io_error() {
                Some(source) => HdfError::Io { context, source },
                None => HdfError::integrity(root, "filesystem loop detected"),
            }
        })?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|err| HdfError::Io {
                context: describe("reading metadata of", entry.path()),
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable")),
            })?;
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Estimated container size in megabytes for the tree at `root`.
///
/// An empty tree estimates to 0; callers apply [`CapacityPolicy::min_size_mb`]
/// (see [`CapacityPolicy::container_mb`]) before handing the size to the packer.
pub fn estimate_size_mb(root: &Path, policy: &CapacityPolicy) -> Result<u64> {
    let bytes = total_size_bytes(root)?;
    let mb = policy.estimate_mb(bytes);
    log::info!(
        "'{}' holds {} bytes, estimated {} MB with {}% margin",
        root.display(),
        bytes,
        mb,
        policy.margin_percent
    );
    Ok(mb)
}
