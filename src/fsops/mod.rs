//! Filesystem primitives behind an injectable seam.
//!
//! Every destructive operation the engine performs goes through [`FileOps`],
//! so tests can run against a tempdir with the production implementation and
//! failures stay distinguishable (not-found, already-exists, permission,
//! no-space) via `RteError` mapping.

use std::fs;
use std::path::Path;

use crate::core::errors::{Result, RteError};

/// Non-transactional filesystem primitives consumed by the engine.
///
/// Implementations must be honest about failure kinds: the engine's guards
/// depend on `exists` and on the `io::ErrorKind` carried by errors.
pub trait FileOps: Send + Sync {
    /// Whether the path currently exists (file, directory, or symlink).
    fn exists(&self, path: &Path) -> bool;

    /// Rename `from` to `to`. Never overwrites: callers check the target
    /// first, and the implementation must not fall back to copy+delete.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Recursively copy a file or directory tree, returning bytes copied.
    /// Parent directories of `to` are created; `to` itself must not exist.
    fn copy_recursive(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Recursively delete a file or directory tree.
    fn remove_recursive(&self, path: &Path) -> Result<()>;

    /// Recursive size of a file or directory tree in bytes.
    fn size_recursive(&self, path: &Path) -> Result<u64>;

    /// Bytes available to unprivileged writers on the volume holding `path`.
    fn available_bytes(&self, path: &Path) -> Result<u64>;

    /// Opaque volume identity for same-volume advisories.
    fn device_id(&self, path: &Path) -> Result<u64>;
}

/// Production [`FileOps`] on top of `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl FileOps for StdFs {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling symlink still counts as occupied.
        fs::symlink_metadata(path).is_ok()
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| RteError::io(from, e))
    }

    fn copy_recursive(&self, from: &Path, to: &Path) -> Result<u64> {
        if self.exists(to) {
            return Err(RteError::TargetExists {
                path: to.to_path_buf(),
            });
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| RteError::io(parent, e))?;
        }
        copy_tree(from, to)
    }

    fn remove_recursive(&self, path: &Path) -> Result<()> {
        let meta = fs::symlink_metadata(path).map_err(|e| RteError::io(path, e))?;
        if meta.is_dir() {
            fs::remove_dir_all(path).map_err(|e| RteError::io(path, e))?;
        } else {
            fs::remove_file(path).map_err(|e| RteError::io(path, e))?;
        }
        // Post-delete verification: the path must actually be gone.
        if self.exists(path) {
            return Err(RteError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("path still exists after deletion"),
            });
        }
        Ok(())
    }

    fn size_recursive(&self, path: &Path) -> Result<u64> {
        let meta = fs::symlink_metadata(path).map_err(|e| RteError::io(path, e))?;
        if !meta.is_dir() {
            return Ok(meta.len());
        }
        let mut total = 0;
        for entry in fs::read_dir(path).map_err(|e| RteError::io(path, e))? {
            let entry = entry.map_err(|e| RteError::io(path, e))?;
            total += self.size_recursive(&entry.path())?;
        }
        Ok(total)
    }

    #[cfg(unix)]
    fn available_bytes(&self, path: &Path) -> Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| RteError::FsStats {
            path: path.to_path_buf(),
            details: errno.to_string(),
        })?;
        Ok(stat.blocks_available().saturating_mul(stat.fragment_size()))
    }

    #[cfg(not(unix))]
    fn available_bytes(&self, path: &Path) -> Result<u64> {
        Err(RteError::UnsupportedPlatform {
            details: format!("no space query available for {}", path.display()),
        })
    }

    #[cfg(unix)]
    fn device_id(&self, path: &Path) -> Result<u64> {
        use std::os::unix::fs::MetadataExt;
        let meta = fs::symlink_metadata(path).map_err(|e| RteError::io(path, e))?;
        Ok(meta.dev())
    }

    #[cfg(not(unix))]
    fn device_id(&self, path: &Path) -> Result<u64> {
        Err(RteError::UnsupportedPlatform {
            details: format!("no volume identity available for {}", path.display()),
        })
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<u64> {
    let meta = fs::symlink_metadata(from).map_err(|e| RteError::io(from, e))?;
    if !meta.is_dir() {
        return fs::copy(from, to).map_err(|e| RteError::io(from, e));
    }

    fs::create_dir(to).map_err(|e| RteError::io(to, e))?;
    let mut total = 0;
    for entry in fs::read_dir(from).map_err(|e| RteError::io(from, e))? {
        let entry = entry.map_err(|e| RteError::io(from, e))?;
        total += copy_tree(&entry.path(), &to.join(entry.file_name()))?;
    }
    Ok(total)
}
