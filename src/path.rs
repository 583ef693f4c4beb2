//! Logical path normalization.
//!
//! Request paths become both cache keys and source lookups, so they are
//! normalized once, strictly: leading, trailing and repeated slashes and `.`
//! segments are dropped; `..`, backslashes and NUL bytes are rejected rather
//! than collapsed, so a normalized path can never name anything outside the
//! root it is joined to.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid path `{path}`: {reason}")]
pub struct InvalidPath {
    pub path: String,
    pub reason: &'static str,
}

/// Normalize a logical path. See the [module docs](self) for the rules.
///
/// ```
/// # use imagecache::path::normalize;
/// assert_eq!(normalize("/photos//./cat.jpg/").unwrap(), "photos/cat.jpg");
/// assert!(normalize("photos/../../etc/passwd").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<String, InvalidPath> {
    let invalid = |reason| InvalidPath {
        path: raw.to_string(),
        reason,
    };

    if raw.contains('\0') {
        return Err(invalid("contains a NUL byte"));
    }
    if raw.contains('\\') {
        return Err(invalid("contains a backslash"));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid("contains a `..` segment")),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(invalid("is empty"));
    }
    Ok(segments.join("/"))
}
