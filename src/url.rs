//! Parsing transformation options out of request paths.
//!
//! Transformed images are addressed by decorating the source file name:
//!
//! ```text
//! photos/cat-image(300x200-crop-rotate(90)-blur(1.5)).jpg
//! └─dir─┘└nm┘      └──────────── options ───────────┘ └ext
//! ```
//!
//! resolves to source `photos/cat.jpg` with parameters
//! `{width: 300, height: 200, crop: true, rotate: 90, blur: 1.5}`.
//!
//! ## Options
//!
//! Options are separated by `-` outside of parentheses.
//!
//! | Form | Parameters |
//! |---|---|
//! | `300x200` | `width = 300`, `height = 200` |
//! | `300x` / `x200` | only `width` / only `height` |
//! | `name` | `name = true` |
//! | `name(arg)` | `name = arg`, parsed as integer, float, bool, then text |
//!
//! A path without the `-image(...)` marker names its source directly and
//! carries no parameters.

use crate::imaging::{ImageFormat, ParamValue, TransformParams};
use crate::path::{self, InvalidPath};

const MARKER: &str = "-image(";

/// A request path split into its source path and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPath {
    /// Normalized request path (the cache key).
    pub request: String,
    /// Normalized path of the source image.
    pub source: String,
    pub params: TransformParams,
}

impl ParsedPath {
    /// Output format implied by the request extension.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_path(&self.request)
    }
}

pub fn parse_request_path(raw: &str) -> Result<ParsedPath, InvalidPath> {
    let request = path::normalize(raw)?;
    let invalid = |reason| InvalidPath {
        path: raw.to_string(),
        reason,
    };

    let (dir, file) = match request.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, request.as_str()),
    };

    let Some(start) = file.find(MARKER) else {
        return Ok(ParsedPath {
            source: request.clone(),
            request,
            params: TransformParams::new(),
        });
    };

    let name = &file[..start];
    let rest = &file[start + MARKER.len()..];
    let close = rest.rfind(')').ok_or_else(|| invalid("has an unclosed `-image(`"))?;
    let (options, ext) = (&rest[..close], &rest[close + 1..]);
    if name.is_empty() {
        return Err(invalid("has no file name before `-image(`"));
    }
    if !(ext.is_empty() || ext.starts_with('.')) {
        return Err(invalid("has text between `)` and the extension"));
    }

    let mut params = TransformParams::new();
    for option in split_options(options).ok_or_else(|| invalid("has unbalanced parentheses"))? {
        parse_option(option, &mut params).ok_or_else(|| invalid("has a malformed option"))?;
    }

    let source_file = format!("{name}{ext}");
    let source = match dir {
        Some(dir) => format!("{dir}/{source_file}"),
        None => source_file,
    };
    Ok(ParsedPath {
        request,
        source,
        params,
    })
}

/// Split on `-` at parenthesis depth zero. `None` when parentheses don't balance.
fn split_options(options: &str) -> Option<Vec<&str>> {
    if options.is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in options.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            '-' if depth == 0 => {
                parts.push(&options[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&options[start..]);
    Some(parts)
}

fn parse_option(option: &str, params: &mut TransformParams) -> Option<()> {
    if let Some((width, height)) = parse_size(option) {
        if let Some(w) = width {
            params.insert("width".into(), ParamValue::Int(w));
        }
        if let Some(h) = height {
            params.insert("height".into(), ParamValue::Int(h));
        }
        return Some(());
    }

    let (name, value) = match option.split_once('(') {
        Some((name, arg)) => (name, parse_arg(arg.strip_suffix(')')?)),
        None => (option, ParamValue::Bool(true)),
    };
    if !is_filter_name(name) {
        return None;
    }
    params.insert(name.to_string(), value);
    Some(())
}

/// Filter names start with a letter or `_`. Anything made only of digits and
/// `x` is a size that failed to parse, such as `100x100x`.
fn is_filter_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    let size_like = name.bytes().all(|b| b.is_ascii_digit() || b == b'x');
    (first.is_ascii_alphabetic() || first == '_')
        && !size_like
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `WxH`, `Wx` or `xH`.
fn parse_size(option: &str) -> Option<(Option<i64>, Option<i64>)> {
    let (w, h) = option.split_once('x')?;
    let side = |s: &str| -> Option<Option<i64>> {
        if s.is_empty() {
            Some(None)
        } else if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok().map(Some)
        } else {
            None
        }
    };
    match (side(w)?, side(h)?) {
        (None, None) => None,
        size => Some(size),
    }
}

fn parse_arg(arg: &str) -> ParamValue {
    if let Ok(i) = arg.parse::<i64>() {
        ParamValue::Int(i)
    } else if let Ok(f) = arg.parse::<f64>() {
        ParamValue::Float(f)
    } else if let Ok(b) = arg.parse::<bool>() {
        ParamValue::Bool(b)
    } else {
        ParamValue::Text(arg.to_string())
    }
}
