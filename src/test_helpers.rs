//! Shared test utilities for the imagecache test suite.
//!
//! Synthetic images are generated in memory with the `image` crate, so tests
//! need no fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_image(tmp.path(), "image.jpg", 300, 300, ImageFormat::Jpeg);
//! let source = LocalSource::new(tmp.path());
//! ```

use crate::imaging::{Image, ImageFormat, Quality, codec};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// A `width`×`height` gradient, so resized output isn't uniformly colored.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    }))
}

/// Encoded bytes of a gradient image.
pub fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = Image::new(gradient(width, height), format);
    codec::encode(&image, format, Quality::default())
        .unwrap_or_else(|e| panic!("encoding {format} test image: {e}"))
}

/// Write a gradient image to `dir/name`, creating `dir` if needed.
pub fn write_test_image(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    format: ImageFormat,
) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, encode_test_image(width, height, format)).unwrap();
    path
}
