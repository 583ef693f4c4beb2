//! Opening, transforming and saving images through a bound [`Source`].
//!
//! The manipulator owns no images. [`ImageManipulator::open`] hands back a
//! fresh [`Image`], [`ImageManipulator::make`] threads it through a
//! [`FilterChain`], and the caller decides what happens to the result.

use crate::chain::FilterChain;
use crate::error::ImageError;
use crate::filters::FilterRegistry;
use crate::fs::{Filesystem, LocalFilesystem};
use crate::imaging::codec;
use crate::imaging::{FILEPATH_KEY, HEADER_LEN, Image, ImageFormat, Quality, TransformParams};
use crate::path;
use crate::source::Source;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ImageManipulator {
    registry: Arc<FilterRegistry>,
    source: Option<Arc<dyn Source>>,
    fs: Arc<dyn Filesystem>,
    quality: Quality,
}

impl ImageManipulator {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self {
            registry,
            source: None,
            fs: Arc::new(LocalFilesystem),
            quality: Quality::default(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Filesystem used by [`save`](Self::save).
    pub fn with_filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn set_source(&mut self, source: Arc<dyn Source>) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&Arc<dyn Source>> {
        self.source.as_ref()
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    fn bound_source(&self) -> Result<&Arc<dyn Source>, ImageError> {
        self.source.as_ref().ok_or(ImageError::NoSource)
    }

    /// Resolve and decode `path`, recording where it came from under
    /// [`FILEPATH_KEY`].
    pub fn open(&self, path: &str) -> Result<Image, ImageError> {
        let source = self.bound_source()?;
        let bytes = source.resolve(path)?;
        let mut image = codec::decode(&bytes)?;
        image.set_metadata(FILEPATH_KEY, source.locate(path)?);
        debug!(
            path,
            driver = source.driver(),
            format = %image.format(),
            width = image.width(),
            height = image.height(),
            "opened image"
        );
        Ok(image)
    }

    /// Detect the format of `path` from its leading bytes without decoding it.
    pub fn format(&self, path: &str) -> Result<ImageFormat, ImageError> {
        let source = self.bound_source()?;
        let header = source.read_header(path, HEADER_LEN)?;
        ImageFormat::detect(&header)
            .ok_or_else(|| ImageError::Decode(format!("{path}: unrecognized image header")))
    }

    /// Open `path` and apply the chain described by `params`.
    ///
    /// Every filter name is checked against the registry before the source
    /// is even read, so an unknown filter costs no I/O.
    pub fn make(&self, path: &str, params: &TransformParams) -> Result<Image, ImageError> {
        let chain = FilterChain::from_params(params);
        chain.validate(&self.registry)?;
        let image = self.open(path)?;
        if chain.is_empty() {
            return Ok(image);
        }
        debug!(path, chain = %chain, "applying filter chain");
        Ok(chain.apply(&self.registry, image)?)
    }

    /// Encode `image` in its own format and write it to `path` under the
    /// source's write root. Returns the file written.
    pub fn save(&self, image: &Image, path: &str) -> Result<PathBuf, ImageError> {
        let source = self.bound_source()?;
        let root = source.write_root().ok_or_else(|| {
            ImageError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} source is read-only", source.driver()),
            ))
        })?;
        let target = root.join(path::normalize(path)?);
        let bytes = codec::encode(image, image.format(), self.quality)?;

        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write_atomic(&target, &bytes)?;
        debug!(path = %target.display(), bytes = bytes.len(), "saved image");
        Ok(target)
    }
}

impl fmt::Debug for ImageManipulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageManipulator")
            .field("source", &self.source.as_ref().map(|s| s.driver()))
            .field("quality", &self.quality)
            .field("filters", &self.registry.names())
            .finish()
    }
}
