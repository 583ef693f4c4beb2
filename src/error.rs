//! Pipeline error type and its HTTP status mapping.
//!
//! Module errors ([`SourceError`], [`FilterError`], [`CodecError`],
//! [`InvalidPath`]) convert into [`ImageError`] with `?`, so every request
//! failure surfaces as one type with one status.

use crate::filters::FilterError;
use crate::imaging::CodecError;
use crate::imaging::ParamError;
use crate::path::InvalidPath;
use crate::source::SourceError;
use http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("source image not found: {0}")]
    SourceNotFound(String),
    #[error("cannot decode image: {0}")]
    Decode(String),
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),
    #[error("invalid parameter for `{filter}`: {source}")]
    InvalidFilterParam {
        filter: String,
        #[source]
        source: ParamError,
    },
    #[error(transparent)]
    InvalidPath(#[from] InvalidPath),
    #[error("cannot write cache file {path}: {reason}")]
    CacheWrite { path: PathBuf, reason: String },
    #[error("no image source is bound")]
    NoSource,
    #[error("unknown route `{0}`")]
    UnknownRoute(String),
    #[error("source failure: {0}")]
    Source(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// HTTP status a front end should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SourceNotFound(_) | Self::UnknownRoute(_) => StatusCode::NOT_FOUND,
            Self::Decode(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidPath(_) | Self::InvalidFilterParam { .. } => StatusCode::BAD_REQUEST,
            Self::UnknownFilter(_)
            | Self::CacheWrite { .. }
            | Self::NoSource
            | Self::Source(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SourceError> for ImageError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => Self::SourceNotFound(path),
            SourceError::InvalidPath(e) => Self::InvalidPath(e),
            other => Self::Source(other.to_string()),
        }
    }
}

impl From<FilterError> for ImageError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Unknown(name) => Self::UnknownFilter(name),
            FilterError::InvalidParam { filter, source } => {
                Self::InvalidFilterParam { filter, source }
            }
            FilterError::Failed { filter, reason } => {
                Self::Io(std::io::Error::other(format!("filter `{filter}` failed: {reason}")))
            }
        }
    }
}

impl From<CodecError> for ImageError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode { .. } => Self::Io(std::io::Error::other(err.to_string())),
            other => Self::Decode(other.to_string()),
        }
    }
}
