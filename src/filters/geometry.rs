//! Size-changing filters: `thumbnail` and `resize`.

use super::{Filter, FilterError};
use crate::imaging::calculations::{
    calculate_crop_region, calculate_fit_dimensions, resolve_box,
};
use crate::imaging::{FilterParams, Image};
use image::imageops::FilterType;

/// Upper bound for any requested width or height.
///
/// Keeps a request like `99999x99999` from allocating gigabytes.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Thumbnail: fit inside `width`×`height`, or fill and center-crop to exactly
/// that size when `crop` is set. Only fitting refuses to upscale.
#[derive(Debug, Clone, Copy)]
pub struct Thumbnail {
    max_dimension: u32,
}

impl Thumbnail {
    pub const NAME: &'static str = "thumbnail";

    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Default for Thumbnail {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl Filter for Thumbnail {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        let (width, height) = requested_box(Self::NAME, params, self.max_dimension)?;
        let crop = params
            .flag("crop")
            .map_err(|e| FilterError::param(Self::NAME, e))?
            .unwrap_or(false);

        if width.is_none() && height.is_none() {
            return Ok(image);
        }

        let source = image.dimensions();
        let target = resolve_box(source, width, height);

        if crop {
            check_output(Self::NAME, target, self.max_dimension)?;
            let (x, y, w, h) = calculate_crop_region(source, target);
            Ok(image.map_pixels(|p| {
                p.crop_imm(x, y, w, h)
                    .resize_exact(target.0, target.1, FilterType::Lanczos3)
            }))
        } else {
            let (w, h) = calculate_fit_dimensions(source, target);
            if (w, h) == source {
                return Ok(image);
            }
            Ok(image.map_pixels(|p| p.resize_exact(w, h, FilterType::Lanczos3)))
        }
    }
}

/// Exact resize. Distorts the aspect ratio when both sides are given.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    max_dimension: u32,
}

impl Resize {
    pub const NAME: &'static str = "resize";

    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Default for Resize {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl Filter for Resize {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        let (width, height) = requested_box(Self::NAME, params, self.max_dimension)?;
        if width.is_none() && height.is_none() {
            return Err(FilterError::invalid(
                Self::NAME,
                "width",
                "or `height` is required",
            ));
        }
        let (w, h) = resolve_box(image.dimensions(), width, height);
        check_output(Self::NAME, (w, h), self.max_dimension)?;
        Ok(image.map_pixels(|p| p.resize_exact(w, h, FilterType::Lanczos3)))
    }
}

fn requested_box(
    filter: &str,
    params: &FilterParams,
    max_dimension: u32,
) -> Result<(Option<u32>, Option<u32>), FilterError> {
    let mut sides = [None, None];
    for (slot, key) in sides.iter_mut().zip(["width", "height"]) {
        let value = params
            .dimension(key)
            .map_err(|e| FilterError::param(filter, e))?;
        if let Some(v) = value
            && v > max_dimension
        {
            return Err(FilterError::invalid(
                filter,
                key,
                format!("exceeds the maximum of {max_dimension}px"),
            ));
        }
        *slot = value;
    }
    Ok((sides[0], sides[1]))
}

/// Sides derived from the aspect ratio are bounded by the same maximum as
/// requested ones.
fn check_output(
    filter: &str,
    (width, height): (u32, u32),
    max_dimension: u32,
) -> Result<(), FilterError> {
    for (key, side) in [("width", width), ("height", height)] {
        if side > max_dimension {
            return Err(FilterError::invalid(
                filter,
                key,
                format!("resulting {side}px exceeds the maximum of {max_dimension}px"),
            ));
        }
    }
    Ok(())
}
