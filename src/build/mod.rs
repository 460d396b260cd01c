//! Building blocks of the HDF assembly pipeline.
//!
//! This module provides:
//! - [`volumes`] - Resolving and unpacking source volumes
//! - [`merge`] - Merging unpacked volume trees
//! - [`commands`] - Injecting common commands from a tools volume
//! - [`startup`] - Startup-sequence generation
//! - [`capacity`] - Container size estimation
//! - [`scratch`] - Self-removing scratch directories

pub mod capacity;
pub mod commands;
pub mod merge;
pub mod scratch;
pub mod startup;
pub mod volumes;
