//! Wiring: config → sources → manipulator → handler → cache.
//!
//! [`ImageService`] is what a front end embeds. It owns everything built at
//! startup (the source drivers, the filter registry, the cache middleware)
//! and answers one request at a time through [`ImageService::handle`]. All
//! of its state is read-only after construction, so one service can be
//! shared across threads.

use crate::cache::CacheMiddleware;
use crate::config::{Config, RouteConfig};
use crate::error::ImageError;
use crate::filters::FilterRegistry;
use crate::imaging::ImageFormat;
use crate::manipulator::ImageManipulator;
use crate::request::{CacheStatus, Handler, Request, Response};
use crate::source::Sources;
use crate::url::parse_request_path;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of warming one path.
#[derive(Debug)]
pub struct WarmOutcome {
    pub path: String,
    pub result: Result<CacheStatus, ImageError>,
}

/// The handler behind the cache: parse the path, run the chain, hand back
/// the rendered image.
#[derive(Debug, Clone)]
pub struct TransformHandler {
    manipulator: ImageManipulator,
}

impl TransformHandler {
    pub fn new(manipulator: ImageManipulator) -> Self {
        Self { manipulator }
    }
}

impl Handler for TransformHandler {
    fn handle(&self, request: &Request) -> Result<Response, ImageError> {
        let parsed = parse_request_path(&request.path)?;
        let image = self.manipulator.make(&parsed.source, &parsed.params)?;
        let format = parsed.format().unwrap_or_else(|| image.format());
        debug!(
            request = %parsed.request,
            source = %parsed.source,
            format = %format,
            "rendered"
        );
        Ok(Response::rendered(image, format))
    }
}

#[derive(Debug)]
pub struct ImageService {
    config: Config,
    sources: Sources,
    registry: Arc<FilterRegistry>,
    cache: CacheMiddleware,
}

impl ImageService {
    /// Build every driver named in `config` and the built-in filters.
    pub fn from_config(config: Config) -> Result<Self, ImageError> {
        let sources = Sources::from_config(&config)?;
        let registry = FilterRegistry::builtin(config.processing.max_dimension);
        Ok(Self::new(config, sources, registry))
    }

    /// Assemble a service from prebuilt parts.
    pub fn new(config: Config, sources: Sources, registry: FilterRegistry) -> Self {
        let cache = CacheMiddleware::new(config.cache_root(None), config.processing.quality());
        Self {
            config,
            sources,
            registry: Arc::new(registry),
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheMiddleware {
        &self.cache
    }

    fn route(&self, name: Option<&str>) -> Result<Option<&RouteConfig>, ImageError> {
        name.map(|name| {
            self.config
                .route(name)
                .ok_or_else(|| ImageError::UnknownRoute(name.to_string()))
        })
        .transpose()
    }

    /// Build a request for `path`, attaching the named route's settings.
    pub fn request(&self, path: &str, route: Option<&str>) -> Result<Request, ImageError> {
        let request = Request::new(path);
        Ok(match self.route(route)? {
            Some(route) => request.with_route(route.clone()),
            None => request,
        })
    }

    /// Cache root that requests on `route` are written under.
    pub fn cache_root(&self, route: Option<&str>) -> Result<PathBuf, ImageError> {
        Ok(self.config.cache_root(self.route(route)?))
    }

    /// A manipulator bound to the route's source, or the default source.
    pub fn manipulator(&self, route: Option<&RouteConfig>) -> Result<ImageManipulator, ImageError> {
        let source = match route.and_then(|r| r.source.as_deref()) {
            Some(name) => self.sources.driver(name)?,
            None => self.sources.default_driver()?,
        };
        Ok(ImageManipulator::new(Arc::clone(&self.registry))
            .with_source(source)
            .with_quality(self.config.processing.quality()))
    }

    /// Serve `request` through the cache.
    pub fn handle(&self, request: &Request) -> Result<Response, ImageError> {
        let result = self.manipulator(request.route.as_ref()).and_then(|m| {
            let handler = TransformHandler::new(m);
            self.cache.handle(request, &handler)
        });
        if let Err(e) = &result {
            warn!(path = %request.path, status = %e.status(), error = %e, "request failed");
        }
        result
    }

    /// Shorthand for [`request`](Self::request) then [`handle`](Self::handle).
    pub fn render(&self, path: &str, route: Option<&str>) -> Result<Response, ImageError> {
        self.handle(&self.request(path, route)?)
    }

    /// Render every path through the cache in parallel on the current rayon
    /// pool. Outcomes come back in input order; one failure never stops the rest.
    pub fn warm(&self, paths: &[String], route: Option<&str>) -> Vec<WarmOutcome> {
        let outcomes: Vec<WarmOutcome> = paths
            .par_iter()
            .map(|path| WarmOutcome {
                path: path.clone(),
                result: self
                    .render(path, route)
                    .map(|r| r.cache.unwrap_or(CacheStatus::Miss)),
            })
            .collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(total = outcomes.len(), failed, "warm finished");
        outcomes
    }

    /// Detect the format of a source image without decoding it.
    pub fn format(&self, path: &str, route: Option<&str>) -> Result<ImageFormat, ImageError> {
        self.manipulator(self.route(route)?)?.format(path)
    }
}
