//! Filesystem seam for the cache and for saved images.
//!
//! The middleware and the manipulator only write through [`Filesystem`], so
//! tests can count or fail individual operations without a real read-only
//! mount.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::Builder;

/// In-flight atomic writes live next to their target as
/// `.imagecache-XXXXXX.partial` until they are renamed into place.
const TEMP_PREFIX: &str = ".imagecache-";
const TEMP_SUFFIX: &str = ".partial";
const TEMP_RAND_LEN: usize = 6;

/// Whether `name` has the exact shape of a temporary file left by
/// [`Filesystem::write_atomic`] on [`LocalFilesystem`].
pub fn is_temp_file(name: &str) -> bool {
    name.strip_prefix(TEMP_PREFIX)
        .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
        .is_some_and(|rand| {
            rand.len() == TEMP_RAND_LEN && rand.bytes().all(|b| b.is_ascii_alphanumeric())
        })
}

pub trait Filesystem: Send + Sync {
    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn dir_exists(&self, path: &Path) -> bool;
    /// Whether new files may be created in the existing directory `path`.
    fn is_writable_dir(&self, path: &Path) -> bool;
    /// Recursive create; an already existing directory is success.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Write `bytes` so that `path` either keeps its old content or holds
    /// all of the new content, never a partial file.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_writable_dir(&self, path: &Path) -> bool {
        let Ok(meta) = fs::metadata(path) else {
            return false;
        };
        if !meta.is_dir() {
            return false;
        }
        // Mode bits rather than access(2): root can write anywhere, but a
        // directory marked read-only must still refuse cache writes.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o222 != 0
        }
        #[cfg(not(unix))]
        {
            !meta.permissions().readonly()
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        match fs::create_dir_all(path) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            other => other,
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .rand_bytes(TEMP_RAND_LEN)
            .tempfile_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
