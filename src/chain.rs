//! Turning request parameters into an ordered filter chain.
//!
//! ## Parameter mapping
//!
//! | Request key | Filter spec |
//! |---|---|
//! | `width`, `height`, `crop` | one `thumbnail` with those keys |
//! | `rotate = n` | `rotate { degrees = n }` |
//! | `name = true` | `name` with no parameters |
//! | `name = false` | omitted |
//! | `name = scalar` | `name { value = scalar }` |
//! | `name = { .. }` | `name` with the table as parameters |
//!
//! ## Precedence
//!
//! Orientation first (`rotate`, `flip`), then geometry (`thumbnail`,
//! `resize`), then every other filter in name order. Rotation changes which
//! side is the width, so a `100x50` box must be measured after the turn.
//! The order depends only on the keys present, never on how the request
//! spelled them, so a given parameter set always yields the same chain.

use crate::filters::{FilterError, FilterRegistry};
use crate::imaging::{FilterParams, Image, ParamValue, TransformParams};
use std::fmt;
use tracing::debug;

/// Keys folded into the `thumbnail` spec.
const THUMBNAIL_KEYS: &[&str] = &["width", "height", "crop"];

/// Filters with a fixed position at the front of the chain.
const PRECEDENCE: &[&str] = &["rotate", "flip", "thumbnail", "resize"];

/// One step of a chain: a filter name and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub name: String,
    pub params: FilterParams,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>, params: FilterParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}({})", self.name, self.params)
        }
    }
}

/// An ordered sequence of filter specs, applied left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    specs: Vec<FilterSpec>,
}

impl FilterChain {
    pub fn new(specs: Vec<FilterSpec>) -> Self {
        Self { specs }
    }

    /// Build the chain for a request's parameters. See the [module docs](self).
    pub fn from_params(params: &TransformParams) -> Self {
        let mut thumbnail = FilterParams::new();
        let mut named: Vec<FilterSpec> = Vec::new();

        for (key, value) in params {
            if THUMBNAIL_KEYS.contains(&key.as_str()) {
                thumbnail.insert(key, value.clone());
                continue;
            }
            let spec_params = match value {
                ParamValue::Bool(false) => continue,
                ParamValue::Bool(true) => FilterParams::new(),
                ParamValue::Table(table) => FilterParams::from(table.clone()),
                scalar if key == "rotate" => FilterParams::new().with("degrees", scalar.clone()),
                scalar => FilterParams::new().with("value", scalar.clone()),
            };
            named.push(FilterSpec::new(key.clone(), spec_params));
        }

        let has_size = thumbnail.get("width").is_some() || thumbnail.get("height").is_some();
        if has_size {
            named.push(FilterSpec::new("thumbnail", thumbnail));
        }

        named.sort_by_key(|spec| precedence(&spec.name));
        Self { specs: named }
    }

    pub fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Fail with the first name the registry does not know.
    pub fn validate(&self, registry: &FilterRegistry) -> Result<(), FilterError> {
        for spec in &self.specs {
            registry.get(&spec.name)?;
        }
        Ok(())
    }

    /// Run every filter in order. Names are validated before any filter runs,
    /// so an unknown name never leaves work half done.
    pub fn apply(&self, registry: &FilterRegistry, image: Image) -> Result<Image, FilterError> {
        self.validate(registry)?;
        self.specs.iter().try_fold(image, |image, spec| {
            debug!(filter = %spec, "applying filter");
            registry.get(&spec.name)?.apply(image, &spec.params)
        })
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.specs.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" → "))
    }
}

/// Sort key: fixed slots first, then everything else by name.
fn precedence(name: &str) -> (usize, String) {
    let slot = PRECEDENCE
        .iter()
        .position(|p| *p == name)
        .unwrap_or(PRECEDENCE.len());
    (slot, name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::tests::StubFilter;
    use crate::imaging::ImageFormat;
    use image::DynamicImage;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn params(entries: &[(&str, ParamValue)]) -> TransformParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn size_keys_fold_into_thumbnail() {
        let chain = FilterChain::from_params(&params(&[
            ("width", 100u32.into()),
            ("height", 80u32.into()),
            ("crop", true.into()),
        ]));
        assert_eq!(chain.names(), vec!["thumbnail"]);
        let spec = &chain.specs()[0];
        assert_eq!(spec.params.dimension("width").unwrap(), Some(100));
        assert_eq!(spec.params.flag("crop").unwrap(), Some(true));
    }

    #[test]
    fn crop_alone_does_not_create_thumbnail() {
        let chain = FilterChain::from_params(&params(&[("crop", true.into())]));
        assert!(chain.is_empty());
    }

    #[test]
    fn rotate_comes_before_thumbnail() {
        let chain = FilterChain::from_params(&params(&[
            ("width", 100u32.into()),
            ("height", 100u32.into()),
            ("rotate", 90u32.into()),
        ]));
        assert_eq!(chain.names(), vec!["rotate", "thumbnail"]);
        assert_eq!(chain.specs()[0].params.int("degrees").unwrap(), Some(90));
    }

    #[test]
    fn other_filters_follow_in_name_order() {
        let chain = FilterChain::from_params(&params(&[
            ("negative", true.into()),
            ("blur", 2.0f64.into()),
            ("width", 10u32.into()),
            ("flip", "v".into()),
            ("grayscale", false.into()),
        ]));
        assert_eq!(chain.names(), vec!["flip", "thumbnail", "blur", "negative"]);
        assert_eq!(chain.specs()[2].params.float("value").unwrap(), Some(2.0));
    }

    #[test]
    fn table_values_become_filter_params() {
        let mut table = BTreeMap::new();
        table.insert("sigma".to_string(), ParamValue::Float(1.5));
        let chain = FilterChain::from_params(&params(&[("blur", ParamValue::Table(table))]));
        assert_eq!(chain.specs()[0].params.float("sigma").unwrap(), Some(1.5));
    }

    #[test]
    fn display_lists_steps() {
        let chain = FilterChain::from_params(&params(&[
            ("width", 10u32.into()),
            ("rotate", 90u32.into()),
        ]));
        assert_eq!(chain.to_string(), "rotate(degrees=90) → thumbnail(width=10)");
    }

    #[test]
    fn unknown_filter_fails_before_any_filter_runs() {
        let rotate = Arc::new(StubFilter::default());
        let mut registry = FilterRegistry::new();
        registry.register("rotate", rotate.clone());

        let chain = FilterChain::from_params(&params(&[
            ("rotate", 90u32.into()),
            ("sepia", true.into()),
        ]));
        let img = Image::new(DynamicImage::new_rgb8(4, 4), ImageFormat::Png);

        let err = chain.apply(&registry, img).unwrap_err();
        assert!(matches!(err, FilterError::Unknown(ref n) if n == "sepia"));
        assert_eq!(rotate.call_count(), 0);
    }

    #[test]
    fn stubs_run_in_chain_order() {
        let rotate = Arc::new(StubFilter::returning(30, 30));
        let thumbnail = Arc::new(StubFilter::returning(10, 10));
        let mut registry = FilterRegistry::new();
        registry
            .register("rotate", rotate.clone())
            .register("thumbnail", thumbnail.clone());

        let chain = FilterChain::from_params(&params(&[
            ("width", 10u32.into()),
            ("height", 10u32.into()),
            ("rotate", 90u32.into()),
        ]));
        let img = Image::new(DynamicImage::new_rgb8(40, 20), ImageFormat::Png);
        let out = chain.apply(&registry, img).unwrap();

        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(rotate.call_count(), 1);
        assert_eq!(thumbnail.call_count(), 1);
        assert_eq!(thumbnail.calls.lock().unwrap()[0], "height=10,width=10");
    }
}
