//! Image representation and codecs, pure Rust via the `image` crate.
//!
//! | Concern | Crate / function |
//! |---|---|
//! | **Detect** | `image::guess_format` on the first [`HEADER_LEN`] bytes |
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Encode** | `JpegEncoder` (quality), `DynamicImage::write_to` (lossless formats) |
//!
//! The module is split into:
//! - **Image**: the [`Image`] value passed through filter chains
//! - **Format**: the [`ImageFormat`] enum and magic-byte detection
//! - **Codec**: [`codec::decode`] / [`codec::encode`]
//! - **Calculations**: pure dimension math used by geometry filters
//! - **Parameters**: typed access to request and filter parameters

pub mod calculations;
pub mod codec;
pub mod format;
mod picture;
pub mod params;

pub use picture::{FILEPATH_KEY, Image};
pub use codec::CodecError;
pub use format::{HEADER_LEN, ImageFormat};
pub use params::{FilterParams, ParamError, ParamValue, Quality, TransformParams};
