//! Request and response values passed between the cache middleware and the
//! downstream handler.

use crate::config::RouteConfig;
use crate::error::ImageError;
use crate::imaging::{Image, ImageFormat};
use std::fmt;
use std::path::PathBuf;

/// An image request: the path as it arrived plus the route it matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub path: String,
    pub route: Option<RouteConfig>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            route: None,
        }
    }

    pub fn with_route(mut self, route: RouteConfig) -> Self {
        self.route = Some(route);
        self
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum Body {
    /// A decoded image still to be encoded in `format`.
    Rendered { image: Image, format: ImageFormat },
    /// Bytes to serve verbatim.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from an existing cache file.
    Hit,
    /// Computed by the handler and written to the cache.
    Miss,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        })
    }
}

#[derive(Debug)]
pub struct Response {
    pub body: Body,
    /// The file this response is served from, once it is on disk.
    pub served_path: Option<PathBuf>,
    /// Set by the cache middleware; handlers leave it empty.
    pub cache: Option<CacheStatus>,
}

impl Response {
    pub fn rendered(image: Image, format: ImageFormat) -> Self {
        Self {
            body: Body::Rendered { image, format },
            served_path: None,
            cache: None,
        }
    }

    pub fn raw(bytes: Vec<u8>) -> Self {
        Self {
            body: Body::Raw(bytes),
            served_path: None,
            cache: None,
        }
    }

    /// Format of the body: declared for rendered bodies, sniffed for raw ones.
    pub fn format(&self) -> Option<ImageFormat> {
        match &self.body {
            Body::Rendered { format, .. } => Some(*format),
            Body::Raw(bytes) => ImageFormat::detect(bytes),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format()
            .map(ImageFormat::mime_type)
            .unwrap_or("application/octet-stream")
    }

    /// Raw body bytes, or `None` for a body that still needs encoding.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Raw(bytes) => Some(bytes),
            Body::Rendered { .. } => None,
        }
    }
}

/// Downstream of the cache: turns a request into a fresh response.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Result<Response, ImageError>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Response, ImageError> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Result<Response, ImageError> {
        self(request)
    }
}
