use super::{Source, SourceError};
use crate::path;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Files under a root directory.
///
/// Logical paths go through [`path::normalize`] before they are joined to
/// the root, so `..` can never reach outside it.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, logical: &str) -> Result<PathBuf, SourceError> {
        Ok(self.root.join(path::normalize(logical)?))
    }

    fn io_error(path: &Path, logical: &str, err: std::io::Error) -> SourceError {
        if err.kind() == ErrorKind::NotFound {
            SourceError::NotFound(logical.to_string())
        } else {
            SourceError::Io {
                path: path.display().to_string(),
                source: err,
            }
        }
    }

    fn open(&self, logical: &str) -> Result<(PathBuf, File), SourceError> {
        let path = self.key_to_path(logical)?;
        if path.is_dir() {
            return Err(SourceError::NotFound(logical.to_string()));
        }
        let file = File::open(&path).map_err(|e| Self::io_error(&path, logical, e))?;
        Ok((path, file))
    }
}

impl Source for LocalSource {
    fn driver(&self) -> &'static str {
        "local"
    }

    fn resolve(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let (full, mut file) = self.open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| Self::io_error(&full, path, e))?;
        Ok(bytes)
    }

    fn exists(&self, path: &str) -> bool {
        self.key_to_path(path).is_ok_and(|p| p.is_file())
    }

    fn read_header(&self, path: &str, len: usize) -> Result<Vec<u8>, SourceError> {
        let (full, file) = self.open(path)?;
        let mut bytes = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| Self::io_error(&full, path, e))?;
        Ok(bytes)
    }

    fn locate(&self, path: &str) -> Result<String, SourceError> {
        Ok(self.key_to_path(path)?.display().to_string())
    }

    fn write_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
