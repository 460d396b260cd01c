use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hdf_builder::artifact::xdftool::{create_adf, create_hdf};
use hdf_builder::build::capacity::{estimate_size_mb, CapacityPolicy, SizeUnit};
use hdf_builder::pipeline::config::{BuildToml, CapacityToml, COMMAND_LINE_ORIGIN};
use hdf_builder::pipeline::{default_config_path, ConfigToml};
use hdf_builder::{preflight, DiskImageTool, Pipeline, PipelineConfig, XdfTool};

#[derive(Parser)]
#[command(version, about = "Assemble a bootable Amiga HDF from ADF floppy images")]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Disk image tool executable
    #[arg(long, global = true)]
    tool: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a directory of ADFs into a new bootable HDF
    Build {
        /// Configuration file (default: <config dir>/hdf-builder/config.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// ADF whose c/ directory supplies the common commands
        #[arg(long)]
        commands: Option<PathBuf>,
        /// Directory of ADFs to merge
        #[arg(long)]
        volumes: Option<PathBuf>,
        /// HDF to create; must not exist
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Volume name of the HDF (default: output file stem)
        #[arg(long)]
        label: Option<String>,
        /// Size with 1 MB = 1,048,576 bytes instead of 1,000,000
        #[arg(long)]
        binary_units: bool,
        /// Free space to leave, in percent of the content size
        #[arg(long)]
        margin: Option<f64>,
        /// Smallest HDF to create, in MB
        #[arg(long)]
        min_size: Option<u64>,
        /// Write <output>.manifest.json
        #[arg(long)]
        manifest: bool,
        /// Skip the destination free space check
        #[arg(long)]
        no_space_check: bool,
    },
    /// Create an empty bootable HDF
    CreateHdf {
        output: PathBuf,
        #[arg(long)]
        size: u64,
        /// Volume name (default: capitalized file stem)
        #[arg(long)]
        label: Option<String>,
    },
    /// Format an empty bootable ADF
    CreateAdf {
        output: PathBuf,
        /// Volume name (default: capitalized file stem)
        #[arg(long)]
        label: Option<String>,
    },
    /// Print the tool's listing of an image
    List { image: PathBuf },
    /// Print the HDF size a directory tree would need
    Estimate {
        dir: PathBuf,
        #[arg(long)]
        binary_units: bool,
        #[arg(long, default_value_t = 30.0)]
        margin: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Build {
            config,
            commands,
            volumes,
            output,
            label,
            binary_units,
            margin,
            min_size,
            manifest,
            no_space_check,
        } => {
            let overrides = ConfigToml {
                build: BuildToml {
                    commands_volume: commands,
                    volumes,
                    output,
                    label,
                    tool: cli.tool.clone(),
                    manifest: manifest.then_some(true),
                    check_space: no_space_check.then_some(false),
                    ..BuildToml::default()
                },
                capacity: CapacityToml {
                    unit: binary_units.then_some(SizeUnit::Binary),
                    margin_percent: margin,
                    min_size_mb: min_size,
                },
            };
            build(config.as_deref(), overrides)
        }
        Commands::CreateHdf {
            output,
            size,
            label,
        } => {
            let (dir, name) = split_output(&output)?;
            let tool = resolve_tool(cli.tool.as_deref())?;
            let image = create_hdf(&tool, &name, label.as_deref(), size, &dir)
                .with_context(|| format!("creating '{}'", output.display()))?;
            println!("{}", image.display());
            Ok(())
        }
        Commands::CreateAdf { output, label } => {
            let (dir, name) = split_output(&output)?;
            let tool = resolve_tool(cli.tool.as_deref())?;
            let image = create_adf(&tool, &name, label.as_deref(), &dir)
                .with_context(|| format!("formatting '{}'", output.display()))?;
            println!("{}", image.display());
            Ok(())
        }
        Commands::List { image } => {
            let listing = resolve_tool(cli.tool.as_deref())?
                .list(&image)
                .with_context(|| format!("listing '{}'", image.display()))?;
            print!("{}", listing);
            Ok(())
        }
        Commands::Estimate {
            dir,
            binary_units,
            margin,
        } => {
            let policy = CapacityPolicy {
                unit: if binary_units {
                    SizeUnit::Binary
                } else {
                    SizeUnit::Decimal
                },
                margin_percent: margin,
                ..CapacityPolicy::default()
            };
            let mb = estimate_size_mb(&dir, &policy)
                .with_context(|| format!("measuring '{}'", dir.display()))?;
            println!("{}", mb);
            Ok(())
        }
    }
}

/// The configured tool, or `xdftool` from PATH after checking it is installed.
fn resolve_tool(program: Option<&Path>) -> Result<XdfTool> {
    match program {
        Some(program) => Ok(XdfTool::with_program(program)),
        None => {
            preflight::check_host_tools().context("checking host tools")?;
            Ok(XdfTool::default())
        }
    }
}

fn build(config_path: Option<&Path>, overrides: ConfigToml) -> Result<()> {
    let (file_config, origin) = match config_path {
        Some(path) => (ConfigToml::load(path)?, path.to_path_buf()),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                log::info!("using config '{}'", path.display());
                (ConfigToml::load(&path)?, path)
            }
            None => (ConfigToml::default(), PathBuf::from(COMMAND_LINE_ORIGIN)),
        },
    };
    let merged = file_config.overlay(overrides);
    let tool = resolve_tool(merged.build.tool.as_deref())?;
    let config = PipelineConfig::from_toml(merged, &origin)?;

    let report = Pipeline::new(config, tool).run()?;
    println!("startup-sequence:\n{}", report.startup_sequence);
    println!(
        "created '{}' ({} MB from {} volume(s))",
        report.destination.display(),
        report.size_mb,
        report.source_volumes.len()
    );
    if let Some(manifest) = report.manifest {
        println!("manifest '{}'", manifest.display());
    }
    Ok(())
}

fn split_output(output: &Path) -> Result<(PathBuf, String)> {
    if output.exists() {
        bail!("'{}' already exists", output.display());
    }
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("'{}' has no file name", output.display()))?
        .to_string();
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name))
}
