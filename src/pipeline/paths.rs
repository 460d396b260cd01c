use std::path::{Path, PathBuf};

/// File name of the per-user configuration file.
pub(crate) const CONFIG_FILENAME: &str = "config.toml";

pub(crate) fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// `<config dir>/hdf-builder/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILENAME))
}

/// Name of the container root directory for `destination`.
///
/// The packer takes the volume name from the top-level directory it packs,
/// so this is the destination file name without its extension.
pub(crate) fn volume_label_for(destination: &Path) -> Option<String> {
    destination
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
