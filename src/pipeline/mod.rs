//! The HDF assembly pipeline.
//!
//! Stages run strictly in order, each finishing before the next starts:
//!
//! ```text
//! validate ─► unpack volumes ─► merge + strip sidecars ─► promote c/
//!          ─► startup-sequence ─► inject commands ─► estimate size ─► pack
//! ```
//!
//! All intermediate state lives in one scratch directory that is removed on
//! every exit path. The destination is only ever written by the final pack
//! step and is removed again if anything after that fails. A pre-existing
//! destination is refused before any work starts.

pub mod config;
pub mod manifest;
mod paths;

pub use config::{ConfigToml, PipelineConfig};
pub use paths::default_config_path;

use crate::artifact::filesystem::join_mkdir;
use crate::artifact::xdftool::{pack_size_bytes, DiskImageTool};
use crate::build::capacity::total_size_bytes;
use crate::build::merge::{self, SCRIPT_DIR};
use crate::build::scratch::ScratchDir;
use crate::build::startup::{read_script, StartupSequence, STARTUP_SEQUENCE};
use crate::build::{commands, volumes};
use crate::error::{HdfError, Result};
use crate::preflight;
use manifest::BuildManifest;
use std::fs;
use std::path::{Path, PathBuf};

/// Width of the generated banner box, including its borders.
const BANNER_WIDTH: usize = 47;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub destination: PathBuf,
    pub size_mb: u64,
    pub content_bytes: u64,
    pub source_volumes: Vec<PathBuf>,
    pub startup_sequence: String,
    pub manifest: Option<PathBuf>,
}

pub struct Pipeline<T: DiskImageTool> {
    config: PipelineConfig,
    tool: T,
}

impl<T: DiskImageTool> Pipeline<T> {
    pub fn new(config: PipelineConfig, tool: T) -> Self {
        Self { config, tool }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assemble the container described by the configuration.
    pub fn run(&self) -> Result<BuildReport> {
        let config = &self.config;
        if config.destination.exists() {
            return Err(HdfError::AlreadyExists {
                path: config.destination.clone(),
            });
        }

        let scratch = match &config.scratch_dir {
            Some(parent) => ScratchDir::new_in(parent)?,
            None => ScratchDir::new()?,
        };
        let mut output = PartialOutput::new(&config.destination);
        let report = self.assemble(scratch.path(), &mut output)?;
        scratch.close()?;
        output.keep();
        Ok(report)
    }

    fn assemble(&self, scratch: &Path, output: &mut PartialOutput) -> Result<BuildReport> {
        let config = &self.config;

        // The packer names the volume after the directory it packs.
        let container_root = join_mkdir(scratch, &config.label)?;
        let unpack_root_name = unpack_root_name(&config.volumes_dir)?;
        let unpack_root = join_mkdir(&container_root, &unpack_root_name)?;

        let source_volumes = volumes::volume_files(&config.volumes_dir)?;
        if source_volumes.is_empty() {
            return Err(HdfError::not_found(
                "volume files in",
                config.volumes_dir.clone(),
            ));
        }
        // Unpacked roots must not share a directory with the merge target.
        let staging = ScratchDir::new_in(scratch)?;
        let roots = volumes::unpack(&self.tool, &config.volumes_dir, staging.path())?.into_paths();
        merge::merge(&roots, &unpack_root)?;
        staging.close()?;
        if config.promote_commands {
            merge::promote_command_dir(&unpack_root, &container_root)?;
        }

        let original = unpack_root.join(SCRIPT_DIR).join(STARTUP_SEQUENCE);
        let original = if original.is_file() {
            Some(read_script(&original)?)
        } else {
            log::warn!(
                "no startup-sequence in merged volumes ('{}'); generating preamble only",
                original.display()
            );
            None
        };
        let sequence = startup_sequence(&unpack_root_name, original.as_deref());
        sequence.write_to(&container_root)?;

        commands::inject_commands(
            &self.tool,
            &config.commands_volume,
            &container_root,
            &config.commands,
        )?;

        let content_bytes = total_size_bytes(scratch)?;
        let estimate = config.capacity.estimate_mb(content_bytes);
        let size_mb = config.capacity.container_mb(content_bytes);
        log::info!(
            "{} bytes of content, estimated {} MB, container {} MB",
            content_bytes,
            estimate,
            size_mb
        );

        if config.check_space {
            let dest_dir = match config.destination.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            preflight::check_available_space(dest_dir, pack_size_bytes(size_mb))?;
        }

        log::info!(
            "packing '{}' into '{}' ({} MB)",
            container_root.display(),
            config.destination.display(),
            size_mb
        );
        output.arm(config.manifest);
        self.tool
            .pack(&container_root, &config.destination, size_mb)?;

        let manifest = if config.manifest {
            let manifest = BuildManifest {
                builder_version: env!("CARGO_PKG_VERSION").to_string(),
                container: config.destination.display().to_string(),
                label: config.label.clone(),
                size_mb,
                content_bytes,
                source_volumes: source_volumes
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
                commands: config.commands.clone(),
                sha256: manifest::sha256_file(&config.destination)?,
                created_at_unix: manifest::now_unix(),
            };
            Some(manifest.write(&config.destination)?)
        } else {
            None
        };

        Ok(BuildReport {
            destination: config.destination.clone(),
            size_mb,
            content_bytes,
            source_volumes,
            startup_sequence: sequence.build(),
            manifest,
        })
    }
}

/// Removes whatever the pack and manifest steps wrote unless the run completes.
///
/// Disarmed until packing starts, so a failure before that never touches the
/// destination path.
#[derive(Debug)]
struct PartialOutput {
    destination: PathBuf,
    paths: Vec<PathBuf>,
}

impl PartialOutput {
    fn new(destination: &Path) -> Self {
        Self {
            destination: destination.to_path_buf(),
            paths: Vec::new(),
        }
    }

    fn arm(&mut self, with_manifest: bool) {
        self.paths.push(self.destination.clone());
        if with_manifest {
            self.paths.push(manifest::manifest_path(&self.destination));
        }
    }

    fn keep(mut self) {
        self.paths.clear();
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists() {
                log::warn!("removing incomplete output '{}'", path.display());
                if let Err(err) = fs::remove_file(path) {
                    log::error!("failed to remove '{}': {}", path.display(), err);
                }
            }
        }
    }
}

/// Directory the source volumes are merged into: the source directory's own name.
fn unpack_root_name(volumes_dir: &Path) -> Result<String> {
    let absolute = std::path::absolute(volumes_dir).map_err(|source| HdfError::Io {
        context: format!("resolving '{}'", volumes_dir.display()),
        source,
    })?;
    absolute
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            HdfError::integrity(
                volumes_dir,
                "source volumes directory has no usable name",
            )
        })
}

fn banner_line(text: &str) -> String {
    format!("| {:<width$} |", text, width = BANNER_WIDTH - 4)
}

/// The generated boot script: banner, `info`, a pause, then `cd` into the
/// merged volumes and replay their original startup-sequence.
pub fn startup_sequence(unpack_root_name: &str, original: Option<&str>) -> StartupSequence {
    let rule = "-".repeat(BANNER_WIDTH);
    let mut seq = StartupSequence::new();
    seq.comment(Some(&rule))
        .comment(Some(&banner_line(&format!(
            "Generated by {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))))
        .comment(Some(&banner_line(env!("CARGO_PKG_REPOSITORY"))))
        .comment(Some(&rule))
        .comment(None)
        .info()
        .wait_default()
        .cd(unpack_root_name);
    if let Some(original) = original {
        seq.comment(Some("start of original startup-sequence"))
            .block(original);
    }
    seq
}
