//! The in-memory image that flows through a filter chain.

use super::format::ImageFormat;
use image::DynamicImage;
use std::collections::BTreeMap;

/// Metadata key holding the resolved location an image was opened from.
pub const FILEPATH_KEY: &str = "filepath";

/// A decoded image plus the format it was read in and free-form metadata.
///
/// Filters consume an `Image` by value and return a new one, so ownership
/// always sits with exactly one stage of the pipeline.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: DynamicImage,
    format: ImageFormat,
    metadata: BTreeMap<String, String>,
}

impl Image {
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self {
            pixels,
            format,
            metadata: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn filepath(&self) -> Option<&str> {
        self.metadata.get(FILEPATH_KEY).map(String::as_str)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the pixel data, keeping format and metadata.
    pub fn map_pixels(self, f: impl FnOnce(DynamicImage) -> DynamicImage) -> Self {
        Self {
            pixels: f(self.pixels),
            format: self.format,
            metadata: self.metadata,
        }
    }
}
