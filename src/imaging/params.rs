//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how*. Requests carry a
//! [`TransformParams`] map; the chain builder splits it into per-filter
//! [`FilterParams`], and each filter reads its own keys through the typed
//! accessors, which report a [`ParamError`] instead of guessing.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ParamValue`]: A scalar or nested table, deserializable from TOML/JSON.
//! - [`TransformParams`]: Request-level map of filter keys to values.
//! - [`FilterParams`]: The parameter subset handed to one filter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Table(BTreeMap<String, ParamValue>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Table(t) => {
                let parts: Vec<String> = t.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Request-level transformation parameters, keyed by parameter or filter name.
pub type TransformParams = BTreeMap<String, ParamValue>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("parameter `{name}` {reason}")]
pub struct ParamError {
    pub name: String,
    pub reason: String,
}

impl ParamError {
    fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parameters handed to a single filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, ParamValue>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, ParamError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(i)) => Ok(Some(*i)),
            Some(ParamValue::Float(x)) if x.fract() == 0.0 => Ok(Some(*x as i64)),
            Some(ParamValue::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ParamError::new(key, format!("expects an integer, got `{s}`"))),
            Some(other) => Err(ParamError::new(
                key,
                format!("expects an integer, got `{other}`"),
            )),
        }
    }

    /// A strictly positive pixel size.
    pub fn dimension(&self, key: &str) -> Result<Option<u32>, ParamError> {
        match self.int(key)? {
            None => Ok(None),
            Some(v) if v > 0 && v <= u32::MAX as i64 => Ok(Some(v as u32)),
            Some(v) => Err(ParamError::new(key, format!("must be positive, got {v}"))),
        }
    }

    pub fn float(&self, key: &str) -> Result<Option<f32>, ParamError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(i)) => Ok(Some(*i as f32)),
            Some(ParamValue::Float(x)) => Ok(Some(*x as f32)),
            Some(ParamValue::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ParamError::new(key, format!("expects a number, got `{s}`"))),
            Some(other) => Err(ParamError::new(
                key,
                format!("expects a number, got `{other}`"),
            )),
        }
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, ParamError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(ParamValue::Int(0)) => Ok(Some(false)),
            Some(ParamValue::Int(1)) => Ok(Some(true)),
            Some(ParamValue::Text(s)) => match s.as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(ParamError::new(key, format!("expects a boolean, got `{s}`"))),
            },
            Some(other) => Err(ParamError::new(
                key,
                format!("expects a boolean, got `{other}`"),
            )),
        }
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            None | Some(ParamValue::Table(_)) => None,
            Some(v) => Some(v.to_string()),
        }
    }
}

impl From<BTreeMap<String, ParamValue>> for FilterParams {
    fn from(map: BTreeMap<String, ParamValue>) -> Self {
        Self(map)
    }
}

impl fmt::Display for FilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn dimension_accepts_ints_and_numeric_text() {
        let p = FilterParams::new().with("width", 120u32).with("height", "80");
        assert_eq!(p.dimension("width").unwrap(), Some(120));
        assert_eq!(p.dimension("height").unwrap(), Some(80));
        assert_eq!(p.dimension("missing").unwrap(), None);
    }

    #[test]
    fn dimension_rejects_zero_and_negative() {
        let p = FilterParams::new().with("width", 0i64).with("height", -5i64);
        assert!(p.dimension("width").is_err());
        let err = p.dimension("height").unwrap_err();
        assert_eq!(err.name, "height");
    }

    #[test]
    fn flag_accepts_bool_like_values() {
        let p = FilterParams::new()
            .with("a", true)
            .with("b", 0i64)
            .with("c", "true")
            .with("d", "maybe");
        assert_eq!(p.flag("a").unwrap(), Some(true));
        assert_eq!(p.flag("b").unwrap(), Some(false));
        assert_eq!(p.flag("c").unwrap(), Some(true));
        assert!(p.flag("d").is_err());
    }

    #[test]
    fn float_accepts_ints() {
        let p = FilterParams::new().with("sigma", 2i64);
        assert_eq!(p.float("sigma").unwrap(), Some(2.0));
    }

    #[test]
    fn params_deserialize_from_toml() {
        let params: TransformParams = toml::from_str(
            r#"
width = 100
crop = true
blur = { sigma = 1.5 }
"#,
        )
        .unwrap();
        assert_eq!(params["width"], ParamValue::Int(100));
        assert_eq!(params["crop"], ParamValue::Bool(true));
        assert!(matches!(params["blur"], ParamValue::Table(_)));
    }

    #[test]
    fn display_is_compact() {
        let p = FilterParams::new().with("height", 50u32).with("width", 100u32);
        assert_eq!(p.to_string(), "height=50,width=100");
    }
}
