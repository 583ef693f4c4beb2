//! # imagecache
//!
//! On-demand image transformation with a filesystem cache keyed by request
//! path. A request like `photos/cat-image(300x200-crop).jpg` resolves the
//! source `photos/cat.jpg`, runs it through a filter chain, and writes the
//! result to `<cache root>/photos/cat-image(300x200-crop).jpg`, where the
//! next identical request finds it without recomputing anything.
//!
//! # Architecture: Request Pipeline
//!
//! ```text
//! Request ─▶ CacheMiddleware ──hit──▶ file bytes
//!                 │ miss
//!                 ▼
//!          TransformHandler ─▶ ImageManipulator ─▶ Source ─▶ decode
//!                                     │
//!                                     ▼
//!                               FilterChain ─▶ Filter* ─▶ Image
//!                 ▲                                        │
//!                 └──────── encode + atomic write ◀────────┘
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`cache`] | Cache middleware: key → path, hit short-circuit, atomic miss writes, listing |
//! | [`service`] | Wires config, sources, filters and cache; the transform handler; parallel warm |
//! | [`manipulator`] | `open`, `format`, `make`, `save` over a bound source |
//! | [`chain`] | Request parameters → ordered filter specs |
//! | [`filters`] | The [`Filter`](filters::Filter) trait, built-in filters, the registry |
//! | [`source`] | The [`Source`](source::Source) trait and the local, memory and http drivers |
//! | [`imaging`] | Image value, format detection, codecs, dimension math, parameters |
//! | [`url`] | `name-image(options).ext` path parsing |
//! | [`path`] | Strict logical path normalization |
//! | [`request`] | Request, response and the handler trait |
//! | [`fs`] | Filesystem seam used by the cache |
//! | [`config`] | `imagecache.toml` loading, merging and validation |
//! | [`error`] | [`ImageError`](error::ImageError) and its HTTP status mapping |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Path-Addressed Cache
//!
//! The cache file for a request sits at the request path under the cache
//! root: no hashing, no manifest. The cache directory can be served as-is by
//! any static file server, and an entry is invalidated by deleting its file.
//!
//! ## Explicit Filter Registry
//!
//! Filters are registered by name once at startup and the registry is never
//! mutated afterwards. Every name in a chain is checked before the first
//! filter runs, so an unknown filter fails the request without touching the
//! source or the cache.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding go through the `image` crate only. No
//! system libraries, no external processes.

pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod filters;
pub mod fs;
pub mod imaging;
pub mod manipulator;
pub mod output;
pub mod path;
pub mod request;
pub mod service;
pub mod source;
pub mod url;

#[cfg(test)]
pub(crate) mod test_helpers;
