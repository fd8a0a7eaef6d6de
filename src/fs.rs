//! Filesystem probe used for store layout checks and profile discovery.

use std::io;
use std::path::{Path, PathBuf};

/// Filesystem primitives the backends need. Injected so stores can be tested
/// against a fabricated layout.
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// True for regular files only (symlinks are not followed).
    fn is_file(&self, path: &Path) -> bool;
    /// True for directories only (symlinks are not followed).
    fn is_dir(&self, path: &Path) -> bool;
    /// True if `path` resolves, through any symlinks, to a regular file.
    fn is_readable_file(&self, path: &Path) -> bool;
    /// True if `path` resolves, through any symlinks, to a directory.
    fn resolves_to_dir(&self, path: &Path) -> bool;
    /// Full paths of the entries directly under `dir`, sorted.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl Filesystem for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn is_readable_file(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    fn resolves_to_dir(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for e in std::fs::read_dir(dir)? {
            entries.push(e?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        std::fs::copy(src, dst).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
