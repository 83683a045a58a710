use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, IoContext, Result};

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Recursively copy `from` into `to`.
///
/// Directories are created with the permission bits of their source
/// counterpart plus owner-write, files are streamed byte-for-byte and set to
/// `0644`. The first error aborts the whole copy; whatever was written before
/// it stays in place.
pub fn copy_dir(from: &Path, to: &Path, bar: &ProgressBar) -> Result<()> {
    let meta = fs::metadata(from).at(from)?;
    if !meta.is_dir() {
        return Err(Error::NotADirectory(from.to_path_buf()));
    }

    // Modes are applied after the walk so a read-only source directory does
    // not stop us from filling its copy.
    let mut dir_modes: Vec<(PathBuf, fs::Permissions)> = Vec::new();

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            Error::io(path, e.into())
        })?;
        let path = entry.path();
        let rel = path
            .strip_prefix(from)
            .map_err(|_| Error::Config(format!("{} escapes {}", path.display(), from.display())))?;
        let dest = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).at(&dest)?;
            let perms = entry.metadata().map_err(|e| Error::io(path, e.into()))?.permissions();
            dir_modes.push((dest, writable(perms)));
        } else {
            copy_file(path, &dest)?;
            bar.inc(1);
        }
    }

    for (dir, perms) in dir_modes.into_iter().rev() {
        fs::set_permissions(&dir, perms).at(&dir)?;
    }
    Ok(())
}

/// Later copies into the same archive directory must still be able to add
/// files, so the owner keeps write access.
#[cfg(unix)]
fn writable(mut perms: fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    perms.set_mode(perms.mode() | 0o200);
    perms
}

#[cfg(not(unix))]
fn writable(mut perms: fs::Permissions) -> fs::Permissions {
    perms.set_readonly(false);
    perms
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).at(from)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(to, fs::Permissions::from_mode(FILE_MODE)).at(to)?;
    }
    Ok(())
}

/// Create `dir` (and parents) unless it already exists as a directory.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fs::create_dir_all(dir).at(dir),
        Err(e) => Err(Error::io(dir, e)),
    }
}

/// Fail with the first path in `dirs` that is not an existing directory.
pub fn require_dirs<'a>(dirs: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    for dir in dirs {
        if !dir.is_dir() {
            return Err(Error::MissingDirectory(dir.to_path_buf()));
        }
    }
    Ok(())
}
