//! Disk image tooling and filesystem helpers.
//!
//! - [`xdftool`] - The [`DiskImageTool`](xdftool::DiskImageTool) seam and its amitools implementation
//! - [`filesystem`] - Merging directory copies and small path helpers

pub mod filesystem;
pub mod xdftool;
