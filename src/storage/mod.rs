use std::fs;
use std::path::{Path, PathBuf};

use crate::config::manifest::BackupManifest;
use crate::error::{Error, IoContext, Result};

/// Where the server materializes frozen parts, relative to its storage root.
/// The `1` is the server's own shadow increment directory.
const SHADOW_DATA: [&str; 3] = ["shadow", "1", "data"];

pub fn shadow_data_dir(storage_root: &Path, database: &str) -> PathBuf {
    SHADOW_DATA
        .iter()
        .fold(storage_root.to_path_buf(), |p, seg| p.join(seg))
        .join(database)
}

pub fn live_data_dir(storage_root: &Path, database: &str) -> PathBuf {
    storage_root.join("data").join(database)
}

/// `metadata/<db>` exists under both the live root and the archive root.
pub fn metadata_dir(root: &Path, database: &str) -> PathBuf {
    root.join("metadata").join(database)
}

pub fn archive_partitions_dir(archive_root: &Path, database: &str) -> PathBuf {
    archive_root.join("partitions").join(database)
}

pub fn manifest_path(archive_root: &Path) -> PathBuf {
    archive_root.join("manifest.json")
}

pub fn load_manifest(archive_root: &Path) -> Result<Option<BackupManifest>> {
    let path = manifest_path(archive_root);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).at(&path)?;
    let manifest = serde_json::from_str(&content).map_err(|source| Error::Manifest { path, source })?;
    Ok(Some(manifest))
}

pub fn save_manifest(archive_root: &Path, manifest: &BackupManifest) -> Result<()> {
    let path = manifest_path(archive_root);
    let content = serde_json::to_string_pretty(manifest)?;
    // Write to a sibling then rename so a crash never leaves half a manifest.
    let tmp = archive_root.join("manifest.json.tmp");
    fs::write(&tmp, content).at(&tmp)?;
    fs::rename(&tmp, &path).at(&path)?;
    Ok(())
}
