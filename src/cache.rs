//! Filesystem cache in front of the transformation handler.
//!
//! # Design
//!
//! The cache is **path-addressed**: a request for `thumbs/cat-image(100x100).jpg`
//! is stored at `<cache root>/thumbs/cat-image(100x100).jpg`. There is no
//! manifest and no hashing; the existence of the file is the hit signal, so
//! a web server pointed at the cache root can serve warm entries without
//! ever calling into this crate.
//!
//! ## Cache root
//!
//! The request's route `cache_path` wins; otherwise the middleware's fallback
//! root, which the service sets from `[cache] path` or `public_path`.
//!
//! ## Writes
//!
//! Misses are written to a temporary file in the target directory and renamed
//! into place. Two concurrent misses for one key both compute the same bytes
//! and the last rename wins; a reader never sees a partial file, and a failed
//! write leaves nothing at the final path.
//!
//! An existing target directory that is not writable fails the request with
//! [`ImageError::CacheWrite`]; a missing one is created.
//!
//! Entries are never expired or deleted here.

use crate::error::ImageError;
use crate::fs::{self, Filesystem, LocalFilesystem};
use crate::imaging::{Quality, codec};
use crate::path::{self, InvalidPath};
use crate::request::{Body, CacheStatus, Handler, Request, Response};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Normalized request path; identical keys map to identical cache files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(request_path: &str) -> Result<Self, InvalidPath> {
        path::normalize(request_path).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of this key's entry under `root`.
    pub fn file_path(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct CacheMiddleware<F: Filesystem = LocalFilesystem> {
    fs: F,
    fallback_root: PathBuf,
    quality: Quality,
}

impl CacheMiddleware<LocalFilesystem> {
    pub fn new(fallback_root: impl Into<PathBuf>, quality: Quality) -> Self {
        Self::with_filesystem(LocalFilesystem, fallback_root, quality)
    }
}

impl<F: Filesystem> CacheMiddleware<F> {
    pub fn with_filesystem(fs: F, fallback_root: impl Into<PathBuf>, quality: Quality) -> Self {
        Self {
            fs,
            fallback_root: fallback_root.into(),
            quality,
        }
    }

    pub fn fallback_root(&self) -> &Path {
        &self.fallback_root
    }

    /// Cache root for `request`: its route's `cache_path`, else the fallback.
    pub fn cache_root<'a>(&'a self, request: &'a Request) -> &'a Path {
        request
            .route
            .as_ref()
            .and_then(|r| r.cache_path.as_deref())
            .unwrap_or(&self.fallback_root)
    }

    pub fn cache_path(&self, request: &Request) -> Result<PathBuf, ImageError> {
        let key = CacheKey::new(&request.path)?;
        Ok(key.file_path(self.cache_root(request)))
    }

    /// Serve `request` from the cache, or run `next` and cache its result.
    pub fn handle(&self, request: &Request, next: &dyn Handler) -> Result<Response, ImageError> {
        let key = CacheKey::new(&request.path)?;
        let file = key.file_path(self.cache_root(request));

        if self.fs.is_file(&file) {
            debug!(key = %key, path = %file.display(), "cache hit");
            let bytes = self.fs.read(&file)?;
            return Ok(Response {
                body: Body::Raw(bytes),
                served_path: Some(file),
                cache: Some(CacheStatus::Hit),
            });
        }

        debug!(key = %key, path = %file.display(), "cache miss");
        let response = next.handle(request)?;

        self.prepare_directory(&file)?;
        let bytes = match response.body {
            Body::Rendered { image, format } => codec::encode(&image, format, self.quality)?,
            Body::Raw(bytes) => bytes,
        };
        self.fs
            .write_atomic(&file, &bytes)
            .map_err(|e| cache_write(&file, e.to_string()))?;
        info!(key = %key, path = %file.display(), bytes = bytes.len(), "cached");

        Ok(Response {
            body: Body::Raw(bytes),
            served_path: Some(file),
            cache: Some(CacheStatus::Miss),
        })
    }

    fn prepare_directory(&self, file: &Path) -> Result<(), ImageError> {
        let Some(dir) = file.parent() else {
            return Ok(());
        };
        if self.fs.dir_exists(dir) {
            if !self.fs.is_writable_dir(dir) {
                return Err(cache_write(file, "directory is not writable"));
            }
            return Ok(());
        }
        self.fs
            .create_dir_all(dir)
            .map_err(|e| cache_write(file, format!("cannot create {}: {e}", dir.display())))
    }
}

impl<F: Filesystem> fmt::Debug for CacheMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMiddleware")
            .field("fallback_root", &self.fallback_root)
            .field("quality", &self.quality)
            .finish()
    }
}

/// One file found under a cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    /// Path relative to the root, `/`-separated: the key it was cached under.
    pub key: String,
    pub size: u64,
}

/// Every cache entry under `root`, sorted by key. A missing root is empty.
///
/// Leftover temporary files from interrupted writes are skipped.
pub fn list_entries(root: &Path) -> Result<Vec<CachedFile>, walkdir::Error> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || fs::is_temp_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(CachedFile {
            key,
            size: entry.metadata()?.len(),
        });
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}

fn cache_write(path: &Path, reason: impl Into<String>) -> ImageError {
    ImageError::CacheWrite {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
