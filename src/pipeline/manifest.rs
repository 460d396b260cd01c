//! Build manifest written next to a finished container.

use crate::error::{describe, HdfError, IoContext, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_SUFFIX: &str = ".manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct BuildManifest {
    pub builder_version: String,
    pub container: String,
    pub label: String,
    pub size_mb: u64,
    pub content_bytes: u64,
    pub source_volumes: Vec<String>,
    pub commands: Vec<String>,
    pub sha256: String,
    pub created_at_unix: i64,
}

/// `<container>.manifest.json`
pub fn manifest_path(container: &Path) -> PathBuf {
    let mut name = container
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(MANIFEST_SUFFIX);
    container.with_file_name(name)
}

/// Hex SHA-256 of the file at `path`.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).io_context(|| describe("opening", path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).io_context(|| describe("hashing", path))?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

impl BuildManifest {
    pub fn write(&self, container: &Path) -> Result<PathBuf> {
        let path = manifest_path(container);
        let json = serde_json::to_string_pretty(self).map_err(|err| HdfError::Io {
            context: describe("serializing manifest for", container),
            source: err.into(),
        })?;
        fs::write(&path, format!("{}\n", json)).io_context(|| describe("writing", &path))?;
        log::info!("wrote manifest '{}'", path.display());
        Ok(path)
    }
}
