//! Service configuration module.
//!
//! Handles loading, validating, and merging `imagecache.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! public_path = "public"      # Fallback cache root
//!
//! [cache]
//! # path = "public/cache"     # Global cache root (defaults to public_path)
//!
//! [source]
//! default = "local"           # Driver used when a route names none
//!
//! [sources.local]
//! driver = "local"            # local | memory | http
//! root = "public"
//!
//! [processing]
//! quality = 90                # JPEG quality (1-100)
//! max_dimension = 4096        # Largest width/height a request may ask for
//! # max_processes = 4         # Workers for `warm` (omit for auto = CPU cores)
//!
//! [routes.thumbs]
//! cache_path = "public/thumbs"
//! source = "local"
//! ```
//!
//! ## Cache root resolution
//!
//! A request's cache root is the first of: its route's `cache_path`, the
//! global `[cache] path`, `public_path`.
//!
//! Relative paths are resolved against the working directory.
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when no explicit config path is given.
pub const CONFIG_FILENAME: &str = "imagecache.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `imagecache.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Conventional public asset root; the last fallback for the cache root.
    pub public_path: PathBuf,
    /// Global cache settings.
    pub cache: CacheConfig,
    /// Default source selection.
    pub source: SourceSelection,
    /// Named source drivers.
    pub sources: BTreeMap<String, SourceConfig>,
    /// Encoding and filter limits.
    pub processing: ProcessingConfig,
    /// Per-route overrides, keyed by route name.
    pub routes: BTreeMap<String, RouteConfig>,
}

fn default_public_path() -> PathBuf {
    PathBuf::from("public")
}

impl Default for Config {
    fn default() -> Self {
        let mut sources = BTreeMap::new();
        sources.insert("local".to_string(), SourceConfig::local(default_public_path()));
        Self {
            public_path: default_public_path(),
            cache: CacheConfig::default(),
            source: SourceSelection::default(),
            sources,
            processing: ProcessingConfig::default(),
            routes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges and references resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.processing.quality) {
            return Err(ConfigError::Validation(
                "processing.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "processing.max_dimension must be non-zero".into(),
            ));
        }
        if !self.sources.contains_key(&self.source.default) {
            return Err(ConfigError::Validation(format!(
                "source.default names unknown source `{}`",
                self.source.default
            )));
        }
        for (name, source) in &self.sources {
            source.validate(name)?;
        }
        for (name, route) in &self.routes {
            if let Some(source) = &route.source
                && !self.sources.contains_key(source)
            {
                return Err(ConfigError::Validation(format!(
                    "routes.{name}.source names unknown source `{source}`"
                )));
            }
        }
        Ok(())
    }

    /// Look up a route by name.
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.get(name)
    }

    /// The cache root for a request on `route` (or on no route).
    pub fn cache_root(&self, route: Option<&RouteConfig>) -> PathBuf {
        route
            .and_then(|r| r.cache_path.clone())
            .or_else(|| self.cache.path.clone())
            .unwrap_or_else(|| self.public_path.clone())
    }
}

/// Global cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory under which cache files are written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Which named source serves requests that don't pick one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSelection {
    pub default: String,
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self {
            default: "local".to_string(),
        }
    }
}

/// Kinds of source driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Files under a directory.
    Local,
    /// An in-process map; starts empty.
    Memory,
    /// A remote base URL fetched over HTTP.
    Http,
}

/// One named source driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub driver: DriverKind,
    /// Root directory (`local` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Base URL (`http` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (`http` only).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl SourceConfig {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            driver: DriverKind::Local,
            root: Some(root.into()),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self.driver {
            DriverKind::Local if self.root.is_none() => Err(ConfigError::Validation(format!(
                "sources.{name}: local driver requires `root`"
            ))),
            DriverKind::Http => match self.base_url.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
                Some(url) => Err(ConfigError::Validation(format!(
                    "sources.{name}: base_url `{url}` must start with http:// or https://"
                ))),
                None => Err(ConfigError::Validation(format!(
                    "sources.{name}: http driver requires `base_url`"
                ))),
            },
            _ => Ok(()),
        }
    }
}

/// Encoding and filter limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Largest width or height a request may ask for.
    pub max_dimension: u32,
    /// Maximum number of parallel workers for the `warm` command.
    /// When absent, defaults to the number of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            max_dimension: crate::filters::DEFAULT_MAX_DIMENSION,
            max_processes: None,
        }
    }
}

impl ProcessingConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Per-route settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteConfig {
    /// Cache root for requests on this route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    /// Source driver for requests on this route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults if it is absent.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `imagecache.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imagecache configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the working directory.
# Unknown keys will cause an error.

# Fallback cache root when neither a route nor [cache] sets one.
public_path = "public"

# ---------------------------------------------------------------------------
# Cache
# ---------------------------------------------------------------------------
[cache]
# Directory cache files are written under. The cache mirrors request paths:
# a request for thumbs/cat-image(100x100).jpg is stored at
# <path>/thumbs/cat-image(100x100).jpg
# path = "public"

# ---------------------------------------------------------------------------
# Sources
# ---------------------------------------------------------------------------
[source]
# Source used by requests whose route doesn't name one.
default = "local"

# Each [sources.<name>] block defines a driver:
#   local  - files under `root`
#   memory - in-process store (embedding and tests)
#   http   - files under `base_url`, fetched on demand
[sources.local]
driver = "local"
root = "public"

# [sources.remote]
# driver = "http"
# base_url = "https://images.example.com/originals"
# timeout_secs = 30

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# JPEG encoding quality (1 = worst, 100 = best). Other formats are lossless.
quality = 90

# Largest width or height a request may ask for.
max_dimension = 4096

# Maximum parallel workers for `imagecache warm`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Routes
# ---------------------------------------------------------------------------
# Per-route overrides, selected with `--route <name>`.
# [routes.thumbs]
# cache_path = "public/thumbs"
# source = "local"
"##
}
