//! Orientation filters: `rotate` and `flip`.
//!
//! These run before geometry filters in a chain, because a quarter turn
//! swaps the effective width and height a thumbnail box is measured against.

use super::{Filter, FilterError};
use crate::imaging::{FilterParams, Image};

/// Clockwise rotation by a multiple of 90 degrees.
///
/// Reads `degrees`, falling back to `value` (the key a bare `rotate=90`
/// request parameter arrives under). Negative angles are normalized, so
/// `-90` is a 270° turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotate;

impl Rotate {
    pub const NAME: &'static str = "rotate";
}

impl Filter for Rotate {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        let key = if params.get("degrees").is_some() {
            "degrees"
        } else {
            "value"
        };
        let degrees = params
            .int(key)
            .map_err(|e| FilterError::param(Self::NAME, e))?
            .unwrap_or(0);

        match degrees.rem_euclid(360) {
            0 => Ok(image),
            90 => Ok(image.map_pixels(|p| p.rotate90())),
            180 => Ok(image.map_pixels(|p| p.rotate180())),
            270 => Ok(image.map_pixels(|p| p.rotate270())),
            _ => Err(FilterError::invalid(
                Self::NAME,
                key,
                format!("must be a multiple of 90, got {degrees}"),
            )),
        }
    }
}

/// Mirror the image horizontally, vertically, or both.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flip;

impl Flip {
    pub const NAME: &'static str = "flip";
}

impl Filter for Flip {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        let direction = params
            .text("direction")
            .or_else(|| params.text("value"))
            .unwrap_or_else(|| "horizontal".to_string());

        match direction.as_str() {
            "h" | "horizontal" | "true" => Ok(image.map_pixels(|p| p.fliph())),
            "v" | "vertical" => Ok(image.map_pixels(|p| p.flipv())),
            "both" => Ok(image.map_pixels(|p| p.fliph().flipv())),
            other => Err(FilterError::invalid(
                Self::NAME,
                "direction",
                format!("must be horizontal, vertical or both, got `{other}`"),
            )),
        }
    }
}
