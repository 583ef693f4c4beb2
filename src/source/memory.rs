use super::{Source, SourceError};
use crate::path;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-process source backed by a map of normalized path → bytes.
///
/// Not writable through `save`; files are added with [`MemorySource::insert`].
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `path`, replacing any previous file.
    pub fn insert(&self, path: &str, bytes: Vec<u8>) -> Result<(), SourceError> {
        let key = path::normalize(path)?;
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Source for MemorySource {
    fn driver(&self) -> &'static str {
        "memory"
    }

    fn resolve(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let key = path::normalize(path)?;
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        path::normalize(path).is_ok_and(|key| {
            self.files
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains_key(&key)
        })
    }

    fn locate(&self, path: &str) -> Result<String, SourceError> {
        Ok(format!("memory://{}", path::normalize(path)?))
    }
}
