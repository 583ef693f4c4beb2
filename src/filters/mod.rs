//! Named image filters and the registry that resolves them.
//!
//! A [`Filter`] is a pure transformation `Image × FilterParams → Image`. The
//! [`FilterRegistry`] maps names to filters; it is assembled once at startup
//! (see [`FilterRegistry::builtin`]) and then shared read-only behind an
//! `Arc`, so request handling never mutates it.
//!
//! ## Built-in filters
//!
//! | Name | Parameters | Effect |
//! |---|---|---|
//! | `thumbnail` | `width`, `height`, `crop` | Fit inside the box, or fill and center-crop when `crop` |
//! | `resize` | `width`, `height` | Exact resize; a missing side keeps the aspect ratio |
//! | `rotate` | `degrees` | Clockwise rotation by a multiple of 90 |
//! | `flip` | `direction` | `horizontal` (default), `vertical` or `both` |
//! | `grayscale` | none | Convert to luma |
//! | `negative` | none | Invert colors |
//! | `blur` | `sigma` | Gaussian blur |

mod adjust;
mod geometry;
mod orientation;

pub use adjust::{Blur, Grayscale, Negative};
pub use geometry::{DEFAULT_MAX_DIMENSION, Resize, Thumbnail};
pub use orientation::{Flip, Rotate};

use crate::imaging::{FilterParams, Image, ParamError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unknown filter `{0}`")]
    Unknown(String),
    #[error("filter `{filter}`: {source}")]
    InvalidParam {
        filter: String,
        #[source]
        source: ParamError,
    },
    #[error("filter `{filter}` failed: {reason}")]
    Failed { filter: String, reason: String },
}

impl FilterError {
    pub(crate) fn param(filter: &str, source: ParamError) -> Self {
        Self::InvalidParam {
            filter: filter.to_string(),
            source,
        }
    }

    pub(crate) fn invalid(filter: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::param(
            filter,
            ParamError {
                name: name.to_string(),
                reason: reason.into(),
            },
        )
    }
}

/// A named, parameterized transformation over a decoded image.
///
/// Implementations must be pure: the same image and parameters always give
/// the same output. That is what lets concurrent cache misses for one key
/// write identical bytes.
pub trait Filter: Send + Sync {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError>;
}

/// Name → filter lookup table.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry. Tests use this to inject stub filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in filters, with geometry filters capped at `max_dimension`.
    pub fn builtin(max_dimension: u32) -> Self {
        let mut registry = Self::new();
        registry
            .register("thumbnail", Thumbnail::new(max_dimension))
            .register("resize", Resize::new(max_dimension))
            .register("rotate", Rotate)
            .register("flip", Flip)
            .register("grayscale", Grayscale)
            .register("negative", Negative)
            .register("blur", Blur);
        registry
    }

    /// Register (or replace) a filter under `name`.
    pub fn register(&mut self, name: impl Into<String>, filter: impl Filter + 'static) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn get(&self, name: &str) -> Result<&dyn Filter, FilterError> {
        self.filters
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FilterError::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}
