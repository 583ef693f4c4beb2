//! Color and detail adjustments.

use super::{Filter, FilterError};
use crate::imaging::{FilterParams, Image};

#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Filter for Grayscale {
    fn apply(&self, image: Image, _params: &FilterParams) -> Result<Image, FilterError> {
        Ok(image.map_pixels(|p| p.grayscale()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Negative;

impl Filter for Negative {
    fn apply(&self, image: Image, _params: &FilterParams) -> Result<Image, FilterError> {
        Ok(image.map_pixels(|mut p| {
            p.invert();
            p
        }))
    }
}

/// Gaussian blur. `sigma` (or a bare value) defaults to 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blur;

impl Blur {
    pub const NAME: &'static str = "blur";
    const MAX_SIGMA: f32 = 100.0;
}

impl Filter for Blur {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        let key = if params.get("sigma").is_some() {
            "sigma"
        } else {
            "value"
        };
        let sigma = params
            .float(key)
            .map_err(|e| FilterError::param(Self::NAME, e))?
            .unwrap_or(1.0);

        if !(sigma > 0.0 && sigma <= Self::MAX_SIGMA) {
            return Err(FilterError::invalid(
                Self::NAME,
                key,
                format!("must be in (0, {}], got {sigma}", Self::MAX_SIGMA),
            ));
        }
        Ok(image.map_pixels(|p| p.blur(sigma)))
    }
}
