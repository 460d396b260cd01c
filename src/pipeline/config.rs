//! Pipeline configuration.
//!
//! Settings come from an optional TOML file layered under command-line
//! overrides. Everything is validated once, when [`PipelineConfig`] is
//! constructed, so the pipeline never discovers a bad setting mid-run.
//!
//! ```toml
//! [build]
//! commands_volume = "adfs/workbench1.3.adf"
//! volumes = "adfs/Games"
//! output = "out/Games.hdf"
//!
//! [capacity]
//! unit = "decimal"
//! margin_percent = 30
//! min_size_mb = 1
//! ```

use crate::build::capacity::{CapacityPolicy, SizeUnit};
use crate::build::commands::default_commands;
use crate::error::{describe, HdfError, IoContext, Result};
use crate::pipeline::paths::{resolve_relative, volume_label_for};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Origin reported for settings that did not come from a file.
pub const COMMAND_LINE_ORIGIN: &str = "<command line>";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    #[serde(default)]
    pub build: BuildToml,
    #[serde(default)]
    pub capacity: CapacityToml,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildToml {
    /// Volume holding the `c` directory commands are injected from.
    pub commands_volume: Option<PathBuf>,
    /// Directory of source volumes to merge.
    pub volumes: Option<PathBuf>,
    /// Destination container.
    pub output: Option<PathBuf>,
    /// Volume name of the container; defaults to the output file stem.
    pub label: Option<String>,
    /// Disk image tool executable.
    pub tool: Option<PathBuf>,
    /// Commands to inject.
    pub commands: Option<Vec<String>>,
    /// Write `<output>.manifest.json` after a successful build.
    pub manifest: Option<bool>,
    /// Parent directory for scratch space; defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Check destination free space before packing.
    pub check_space: Option<bool>,
    /// Copy the merged volumes' `c` directory to the container root.
    pub promote_commands: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapacityToml {
    pub unit: Option<SizeUnit>,
    pub margin_percent: Option<f64>,
    pub min_size_mb: Option<u64>,
}

impl ConfigToml {
    /// Read and parse `path`. Relative paths inside are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).io_context(|| describe("reading config", path))?;
        let mut parsed: ConfigToml =
            toml::from_str(&text).map_err(|err| HdfError::config(path, err.to_string()))?;

        let base = path.parent().unwrap_or(Path::new(""));
        let build = &mut parsed.build;
        for field in [
            &mut build.commands_volume,
            &mut build.volumes,
            &mut build.output,
            &mut build.scratch_dir,
        ] {
            if let Some(value) = field.as_mut() {
                *value = resolve_relative(base, value);
            }
        }
        if let Some(tool) = build.tool.as_mut() {
            // A bare program name is looked up on PATH, not next to the config.
            if tool.components().count() > 1 {
                *tool = resolve_relative(base, tool);
            }
        }
        Ok(parsed)
    }

    /// Layer `over` on top of `self`; every value set in `over` wins.
    pub fn overlay(self, over: ConfigToml) -> ConfigToml {
        let (b, o) = (self.build, over.build);
        let (c, oc) = (self.capacity, over.capacity);
        ConfigToml {
            build: BuildToml {
                commands_volume: o.commands_volume.or(b.commands_volume),
                volumes: o.volumes.or(b.volumes),
                output: o.output.or(b.output),
                label: o.label.or(b.label),
                tool: o.tool.or(b.tool),
                commands: o.commands.or(b.commands),
                manifest: o.manifest.or(b.manifest),
                scratch_dir: o.scratch_dir.or(b.scratch_dir),
                check_space: o.check_space.or(b.check_space),
                promote_commands: o.promote_commands.or(b.promote_commands),
            },
            capacity: CapacityToml {
                unit: oc.unit.or(c.unit),
                margin_percent: oc.margin_percent.or(c.margin_percent),
                min_size_mb: oc.min_size_mb.or(c.min_size_mb),
            },
        }
    }
}

/// Validated settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub commands_volume: PathBuf,
    pub volumes_dir: PathBuf,
    pub destination: PathBuf,
    pub label: String,
    pub commands: Vec<String>,
    pub capacity: CapacityPolicy,
    pub manifest: bool,
    pub scratch_dir: Option<PathBuf>,
    pub check_space: bool,
    pub promote_commands: bool,
}

impl PipelineConfig {
    /// Validated configuration with default settings for everything optional.
    pub fn new(
        commands_volume: impl Into<PathBuf>,
        volumes_dir: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::from_toml(
            ConfigToml {
                build: BuildToml {
                    commands_volume: Some(commands_volume.into()),
                    volumes: Some(volumes_dir.into()),
                    output: Some(destination.into()),
                    ..BuildToml::default()
                },
                capacity: CapacityToml::default(),
            },
            Path::new(COMMAND_LINE_ORIGIN),
        )
    }

    /// Validate parsed settings. `origin` names their source in error messages.
    pub fn from_toml(config: ConfigToml, origin: &Path) -> Result<Self> {
        let build = config.build;
        let required = |value: Option<PathBuf>, key: &str| {
            value
                .filter(|path| !path.as_os_str().is_empty())
                .ok_or_else(|| HdfError::config(origin, format!("build.{} must be set", key)))
        };

        let commands_volume = required(build.commands_volume, "commands_volume")?;
        let volumes_dir = required(build.volumes, "volumes")?;
        let destination = required(build.output, "output")?;

        if !commands_volume.is_file() {
            return Err(HdfError::not_found("commands volume", commands_volume));
        }
        if !volumes_dir.is_dir() {
            return Err(HdfError::not_found("source volumes directory", volumes_dir));
        }
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(HdfError::not_found("destination directory", parent));
            }
        }

        let label = match build.label {
            Some(label) => label,
            None => volume_label_for(&destination).ok_or_else(|| {
                HdfError::config(
                    origin,
                    format!(
                        "cannot derive a volume label from '{}'",
                        destination.display()
                    ),
                )
            })?,
        };
        validate_label(&label, origin)?;

        let defaults = CapacityPolicy::default();
        let capacity = CapacityPolicy {
            unit: config.capacity.unit.unwrap_or(defaults.unit),
            margin_percent: config
                .capacity
                .margin_percent
                .unwrap_or(defaults.margin_percent),
            min_size_mb: config.capacity.min_size_mb.unwrap_or(defaults.min_size_mb),
        };
        if !capacity.margin_percent.is_finite() || capacity.margin_percent < 0.0 {
            return Err(HdfError::config(
                origin,
                format!(
                    "capacity.margin_percent must be a non-negative number, got {}",
                    capacity.margin_percent
                ),
            ));
        }
        if capacity.min_size_mb == 0 {
            return Err(HdfError::config(
                origin,
                "capacity.min_size_mb must be at least 1",
            ));
        }

        let commands = build.commands.unwrap_or_else(default_commands);
        if let Some(bad) = commands
            .iter()
            .find(|c| c.is_empty() || c.contains(['/', ':']))
        {
            return Err(HdfError::config(
                origin,
                format!("invalid command name '{}'", bad),
            ));
        }

        Ok(Self {
            commands_volume,
            volumes_dir,
            destination,
            label,
            commands,
            capacity,
            manifest: build.manifest.unwrap_or(false),
            scratch_dir: build.scratch_dir,
            check_space: build.check_space.unwrap_or(true),
            promote_commands: build.promote_commands.unwrap_or(true),
        })
    }
}

fn validate_label(label: &str, origin: &Path) -> Result<()> {
    if label.trim().is_empty() {
        return Err(HdfError::config(origin, "volume label must not be empty"));
    }
    if label.contains(['/', ':']) {
        return Err(HdfError::config(
            origin,
            format!("volume label '{}' must not contain '/' or ':'", label),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("wb.adf"), "").unwrap();
            fs::create_dir(temp.path().join("Games")).unwrap();
            Self { temp }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }
    }

    #[test]
    fn new_applies_defaults() {
        let fx = Fixture::new();
        let config =
            PipelineConfig::new(fx.path("wb.adf"), fx.path("Games"), fx.path("Games.hdf")).unwrap();
        assert_eq!(config.label, "Games");
        assert_eq!(config.commands, default_commands());
        assert_eq!(config.capacity, CapacityPolicy::default());
        assert!(!config.manifest);
        assert!(config.check_space);
        assert!(config.promote_commands);
    }

    #[test]
    fn missing_commands_volume_is_not_found() {
        let fx = Fixture::new();
        let err = PipelineConfig::new(fx.path("nope.adf"), fx.path("Games"), fx.path("x.hdf"))
            .unwrap_err();
        assert!(matches!(err, HdfError::NotFound { .. }));
    }

    #[test]
    fn volumes_must_be_directory() {
        let fx = Fixture::new();
        let err = PipelineConfig::new(fx.path("wb.adf"), fx.path("wb.adf"), fx.path("x.hdf"))
            .unwrap_err();
        assert!(matches!(err, HdfError::NotFound { .. }));
    }

    #[test]
    fn missing_output_is_config_error() {
        let fx = Fixture::new();
        let config = ConfigToml {
            build: BuildToml {
                commands_volume: Some(fx.path("wb.adf")),
                volumes: Some(fx.path("Games")),
                ..BuildToml::default()
            },
            ..ConfigToml::default()
        };
        let err = PipelineConfig::from_toml(config, Path::new("cfg.toml")).unwrap_err();
        assert!(err.to_string().contains("build.output must be set"));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let fx = Fixture::new();
        let cfg = fx.path("hdf-builder.toml");
        fs::write(
            &cfg,
            r#"
[build]
commands_volume = "wb.adf"
volumes = "Games"
output = "out/Games.hdf"
tool = "xdftool"
commands = ["echo", "dir"]
manifest = true

[capacity]
unit = "binary"
margin_percent = 10.0
"#,
        )
        .unwrap();

        let parsed = ConfigToml::load(&cfg).unwrap();
        assert_eq!(parsed.build.commands_volume, Some(fx.path("wb.adf")));
        assert_eq!(parsed.build.output, Some(fx.path("out/Games.hdf")));
        assert_eq!(parsed.build.tool, Some(PathBuf::from("xdftool")));
        assert_eq!(parsed.capacity.unit, Some(SizeUnit::Binary));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let fx = Fixture::new();
        let cfg = fx.path("bad.toml");
        fs::write(&cfg, "[build]\nvolume = \"x\"\n").unwrap();
        let err = ConfigToml::load(&cfg).unwrap_err();
        assert!(matches!(err, HdfError::Config { .. }));
    }

    #[test]
    fn overlay_prefers_overrides() {
        let base = ConfigToml {
            build: BuildToml {
                label: Some("Base".into()),
                manifest: Some(true),
                ..BuildToml::default()
            },
            capacity: CapacityToml {
                margin_percent: Some(30.0),
                ..CapacityToml::default()
            },
        };
        let over = ConfigToml {
            build: BuildToml {
                label: Some("Over".into()),
                ..BuildToml::default()
            },
            capacity: CapacityToml {
                min_size_mb: Some(4),
                ..CapacityToml::default()
            },
        };
        let merged = base.overlay(over);
        assert_eq!(merged.build.label.as_deref(), Some("Over"));
        assert_eq!(merged.build.manifest, Some(true));
        assert_eq!(merged.capacity.margin_percent, Some(30.0));
        assert_eq!(merged.capacity.min_size_mb, Some(4));
    }

    #[test]
    fn rejects_bad_label_and_margin() {
        let fx = Fixture::new();
        let mut config = ConfigToml {
            build: BuildToml {
                commands_volume: Some(fx.path("wb.adf")),
                volumes: Some(fx.path("Games")),
                output: Some(fx.path("Games.hdf")),
                label: Some("dh0:Games".into()),
                ..BuildToml::default()
            },
            ..ConfigToml::default()
        };
        assert!(PipelineConfig::from_toml(config.clone(), Path::new("c")).is_err());

        config.build.label = None;
        config.capacity.margin_percent = Some(-5.0);
        assert!(PipelineConfig::from_toml(config.clone(), Path::new("c")).is_err());

        config.capacity.margin_percent = Some(0.0);
        config.capacity.min_size_mb = Some(0);
        assert!(PipelineConfig::from_toml(config, Path::new("c")).is_err());
    }

    #[test]
    fn rejects_bad_command_names() {
        let fx = Fixture::new();
        let config = ConfigToml {
            build: BuildToml {
                commands_volume: Some(fx.path("wb.adf")),
                volumes: Some(fx.path("Games")),
                output: Some(fx.path("Games.hdf")),
                commands: Some(vec!["c/dir".into()]),
                ..BuildToml::default()
            },
            ..ConfigToml::default()
        };
        let err = PipelineConfig::from_toml(config, Path::new("c")).unwrap_err();
        assert!(err.to_string().contains("c/dir"));
    }
}
