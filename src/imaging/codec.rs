//! Decode and encode through the `image` crate.
//!
//! | Format | Decode | Encode |
//! |---|---|---|
//! | JPEG | `image` (zune-jpeg) | `JpegEncoder` with [`Quality`] |
//! | PNG, GIF, TIFF, BMP | `image` | `DynamicImage::write_to` |
//! | WebP | `image` | lossless `WebPEncoder` via `write_to` |
//!
//! Formats are detected from magic bytes, so [`decode`] and
//! [`ImageFormat::detect`] always agree about what a buffer contains.

use super::format::ImageFormat;
use super::picture::Image;
use super::params::Quality;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported image format")]
    Unsupported,
    #[error("failed to decode {format} data: {reason}")]
    Decode {
        format: ImageFormat,
        reason: String,
    },
    #[error("failed to encode {format}: {reason}")]
    Encode {
        format: ImageFormat,
        reason: String,
    },
}

/// Decode a complete image buffer.
pub fn decode(bytes: &[u8]) -> Result<Image, CodecError> {
    let format = ImageFormat::detect(bytes).ok_or(CodecError::Unsupported)?;
    let pixels = image::load_from_memory_with_format(bytes, format.to_image()).map_err(|e| {
        CodecError::Decode {
            format,
            reason: e.to_string(),
        }
    })?;
    Ok(Image::new(pixels, format))
}

/// Encode an image in the given format.
///
/// `quality` only affects lossy formats (JPEG); the rest are lossless.
pub fn encode(
    image: &Image,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let pixels = pixels_for(format, image.pixels());
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            pixels.write_with_encoder(encoder)
        }
        other => pixels.write_to(&mut Cursor::new(&mut buf), other.to_image()),
    };
    result.map_err(|e| CodecError::Encode {
        format,
        reason: e.to_string(),
    })?;
    Ok(buf)
}

/// Convert to a pixel layout the target encoder accepts.
///
/// JPEG has no alpha channel; GIF, WebP, TIFF and BMP reject 16-bit and
/// float buffers. PNG takes everything the decoders can produce.
fn pixels_for(format: ImageFormat, pixels: &DynamicImage) -> DynamicImage {
    match (format, pixels) {
        (ImageFormat::Png, _) => pixels.clone(),
        (ImageFormat::Jpeg, DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_)) => {
            pixels.clone()
        }
        (ImageFormat::Jpeg, _) => DynamicImage::ImageRgb8(pixels.to_rgb8()),
        (_, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) => pixels.clone(),
        _ => DynamicImage::ImageRgba8(pixels.to_rgba8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> Image {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        Image::new(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn png_encode_decode_keeps_dimensions() {
        let bytes = encode(&gradient(64, 48), ImageFormat::Png, Quality::default()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
        assert_eq!(decoded.format(), ImageFormat::Png);
    }

    #[test]
    fn jpeg_encode_drops_alpha() {
        let rgba = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 128]));
        let img = Image::new(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

        let bytes = encode(&img, ImageFormat::Jpeg, Quality::new(80)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format(), ImageFormat::Jpeg);
        assert_eq!(decoded.dimensions(), (16, 16));
    }

    #[test]
    fn encoding_is_deterministic() {
        let img = gradient(32, 32);
        let a = encode(&img, ImageFormat::Jpeg, Quality::new(85)).unwrap();
        let b = encode(&img, ImageFormat::Jpeg, Quality::new(85)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn gif_and_webp_encode() {
        let img = gradient(20, 10);
        for format in [ImageFormat::Gif, ImageFormat::WebP, ImageFormat::Bmp] {
            let bytes = encode(&img, format, Quality::default()).unwrap();
            assert_eq!(ImageFormat::detect(&bytes), Some(format));
        }
    }

    #[test]
    fn decode_rejects_unknown_bytes() {
        assert!(matches!(
            decode(b"plain text, not pixels"),
            Err(CodecError::Unsupported)
        ));
    }

    #[test]
    fn decode_reports_truncated_data() {
        let bytes = encode(&gradient(32, 32), ImageFormat::Png, Quality::default()).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            decode(truncated),
            Err(CodecError::Decode {
                format: ImageFormat::Png,
                ..
            })
        ));
    }
}
