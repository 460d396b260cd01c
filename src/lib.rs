//! Assemble a bootable Amiga hard disk image (HDF) from floppy images (ADF).
//!
//! Games and applications for the Amiga were distributed on several floppy
//! disks, each booting from its own `s/startup-sequence`. This crate unpacks
//! a set of floppies, merges their trees into one directory, adds the handful
//! of AmigaDOS commands a boot script needs, generates a startup-sequence for
//! the merged tree, and packs the result into a correctly sized HDF.
//!
//! - **Disk image tool** - All image I/O goes through the [`DiskImageTool`] trait,
//!   backed by amitools' `xdftool`
//! - **Build blocks** - Volume unpacking, tree merging, command injection,
//!   startup-sequence generation, capacity estimation
//! - **Pipeline** - [`Pipeline`] runs the stages in order inside a scratch
//!   directory that is always cleaned up
//! - **Preflight checks** - Host tool and free space validation
//!
//! # Architecture
//!
//! ```text
//! hdf-builder (binary)
//!     │
//!     ├── pipeline::config   TOML + CLI settings ─► PipelineConfig
//!     └── pipeline::Pipeline
//!             │
//!             ├── build::volumes    list + unpack each ADF
//!             ├── build::merge      merged tree, no sidecars
//!             ├── build::startup    s/startup-sequence
//!             ├── build::commands   c/ from a Workbench disk
//!             ├── build::capacity   size in MB + margin
//!             └── artifact::xdftool pack
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hdf_builder::{Pipeline, PipelineConfig, XdfTool};
//!
//! let config = PipelineConfig::new("adfs/wb13.adf", "adfs/Games", "out/Games.hdf")?;
//! let report = Pipeline::new(config, XdfTool::default()).run()?;
//! println!("{} MB", report.size_mb);
//! ```

pub mod artifact;
pub mod build;
pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod process;

pub use artifact::xdftool::{DiskImageTool, XdfTool};
pub use build::startup::StartupSequence;
pub use error::{HdfError, Result};
pub use pipeline::{BuildReport, Pipeline, PipelineConfig};
