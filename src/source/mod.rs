//! Pluggable image sources.
//!
//! A [`Source`] resolves a logical path (`photos/cat.jpg`) to raw bytes. The
//! manipulator and format inspection only ever see this trait, never a
//! concrete driver, so adding a backend means adding a driver here and
//! nothing else.
//!
//! | Driver | Type | Location reported as `filepath` |
//! |---|---|---|
//! | `local` | [`LocalSource`] | absolute-or-relative file path under `root` |
//! | `memory` | [`MemorySource`] | `memory://<path>` |
//! | `http` | [`HttpSource`] | `<base_url>/<path>` |
//!
//! Sources do no caching of their own; caching is the cache middleware's job.

mod http;
mod local;
mod memory;

pub use self::http::HttpSource;
pub use local::LocalSource;
pub use memory::MemorySource;

use crate::config::{Config, DriverKind, SourceConfig};
use crate::path::InvalidPath;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("image not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("remote source error: {0}")]
    Remote(String),
    #[error("unknown source `{0}`")]
    UnknownDriver(String),
    #[error("source misconfigured: {0}")]
    Misconfigured(String),
}

/// Backend that turns logical paths into image bytes.
pub trait Source: Send + Sync + fmt::Debug {
    /// Driver name (`local`, `memory`, `http`).
    fn driver(&self) -> &'static str;

    /// Read the complete file at `path`.
    fn resolve(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Whether `path` names an existing file.
    fn exists(&self, path: &str) -> bool;

    /// Read at most `len` leading bytes. Drivers that can read a prefix
    /// cheaply should override this; the default reads everything.
    fn read_header(&self, path: &str, len: usize) -> Result<Vec<u8>, SourceError> {
        let mut bytes = self.resolve(path)?;
        bytes.truncate(len);
        Ok(bytes)
    }

    /// Human-readable location of `path`, recorded as the image's `filepath`.
    fn locate(&self, path: &str) -> Result<String, SourceError>;

    /// Directory that `save` writes into, if this source is writable.
    fn write_root(&self) -> Option<&Path> {
        None
    }
}

/// Named source drivers, built once from config.
#[derive(Debug, Clone)]
pub struct Sources {
    drivers: HashMap<String, Arc<dyn Source>>,
    default: String,
}

impl Sources {
    /// A registry with a single driver, which is also the default.
    pub fn single(name: impl Into<String>, source: Arc<dyn Source>) -> Self {
        let name = name.into();
        let mut drivers = HashMap::new();
        drivers.insert(name.clone(), source);
        Self {
            drivers,
            default: name,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let mut drivers = HashMap::new();
        for (name, source) in &config.sources {
            drivers.insert(name.clone(), build_driver(source)?);
        }
        if !drivers.contains_key(&config.source.default) {
            return Err(SourceError::UnknownDriver(config.source.default.clone()));
        }
        Ok(Self {
            drivers,
            default: config.source.default.clone(),
        })
    }

    /// Add or replace a driver.
    pub fn insert(&mut self, name: impl Into<String>, source: Arc<dyn Source>) {
        self.drivers.insert(name.into(), source);
    }

    pub fn driver(&self, name: &str) -> Result<Arc<dyn Source>, SourceError> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownDriver(name.to_string()))
    }

    pub fn default_driver(&self) -> Result<Arc<dyn Source>, SourceError> {
        self.driver(&self.default)
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }
}

fn build_driver(config: &SourceConfig) -> Result<Arc<dyn Source>, SourceError> {
    Ok(match config.driver {
        DriverKind::Local => {
            let root = config
                .root
                .clone()
                .ok_or_else(|| SourceError::Misconfigured("local driver requires a root".into()))?;
            Arc::new(LocalSource::new(root))
        }
        DriverKind::Memory => Arc::new(MemorySource::new()),
        DriverKind::Http => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| SourceError::Misconfigured("http driver requires a base_url".into()))?;
            Arc::new(HttpSource::new(
                base_url,
                Duration::from_secs(config.timeout_secs),
            )?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_default_local_driver() {
        let sources = Sources::from_config(&Config::default()).unwrap();
        assert_eq!(sources.default_name(), "local");
        assert_eq!(sources.default_driver().unwrap().driver(), "local");
    }

    #[test]
    fn from_config_builds_every_named_driver() {
        let mut config = Config::default();
        config.sources.insert(
            "scratch".into(),
            SourceConfig {
                driver: DriverKind::Memory,
                root: None,
                base_url: None,
                timeout_secs: 5,
            },
        );
        config.sources.insert(
            "remote".into(),
            SourceConfig {
                driver: DriverKind::Http,
                root: None,
                base_url: Some("https://img.example.com/".into()),
                timeout_secs: 5,
            },
        );

        let sources = Sources::from_config(&config).unwrap();
        assert_eq!(sources.driver("scratch").unwrap().driver(), "memory");
        assert_eq!(sources.driver("remote").unwrap().driver(), "http");
    }

    #[test]
    fn unknown_driver_name_is_an_error() {
        let sources = Sources::single("mem", Arc::new(MemorySource::new()));
        assert!(matches!(
            sources.driver("s3"),
            Err(SourceError::UnknownDriver(ref n)) if n == "s3"
        ));
    }

    #[test]
    fn default_read_header_truncates() {
        let source = MemorySource::new();
        source.insert("a.bin", vec![1, 2, 3, 4, 5]).unwrap();
        // MemorySource uses the trait's default read_header
        assert_eq!(source.read_header("a.bin", 2).unwrap(), vec![1, 2]);
    }
}
