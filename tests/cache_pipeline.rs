//! End-to-end tests of the cache → handler → manipulator → source pipeline,
//! using only the public API.

use image::{DynamicImage, ImageFormat as RawFormat, Rgb, RgbImage};
use imagecache::cache::CacheMiddleware;
use imagecache::config::{Config, RouteConfig, SourceConfig};
use imagecache::error::ImageError;
use imagecache::filters::{Filter, FilterError, FilterRegistry};
use imagecache::imaging::{FilterParams, Image, ImageFormat, ParamValue, Quality, TransformParams};
use imagecache::manipulator::ImageManipulator;
use imagecache::request::{CacheStatus, Handler, Request, Response};
use imagecache::service::{ImageService, TransformHandler};
use imagecache::source::{LocalSource, Source};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =========================================================================
// Helpers
// =========================================================================

/// Write a `width`×`height` gradient image to `dir/name`.
fn write_image(dir: &Path, name: &str, width: u32, height: u32, format: RawFormat) {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, buf).unwrap();
}

/// A public dir holding the 300×300 `image.jpg` and `image.png` fixtures.
fn fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_image(tmp.path(), "image.jpg", 300, 300, RawFormat::Jpeg);
    write_image(tmp.path(), "image.png", 300, 300, RawFormat::Png);
    tmp
}

fn local_manipulator(root: &Path) -> ImageManipulator {
    ImageManipulator::new(Arc::new(FilterRegistry::builtin(4096)))
        .with_source(Arc::new(LocalSource::new(root)))
}

fn params(pairs: &[(&str, i64)]) -> TransformParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), ParamValue::Int(*v)))
        .collect()
}

/// Handler wrapper that counts how often the cache falls through to it.
struct Counting<H> {
    inner: H,
    calls: AtomicUsize,
}

impl<H: Handler> Counting<H> {
    fn new(inner: H) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<H: Handler> Handler for Counting<H> {
    fn handle(&self, request: &Request) -> Result<Response, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.handle(request)
    }
}

/// Filter that records each call and returns its input unchanged.
#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<String>>,
}

impl Filter for Recording {
    fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
        self.calls.lock().unwrap().push(params.to_string());
        Ok(image)
    }
}

// =========================================================================
// Manipulator
// =========================================================================

#[test]
fn open_reports_dimensions_and_filepath() {
    let tmp = fixtures();
    let m = local_manipulator(tmp.path());
    let image = m.open("image.jpg").unwrap();
    assert_eq!(image.dimensions(), (300, 300));
    let expected = tmp.path().join("image.jpg").display().to_string();
    assert_eq!(image.filepath(), Some(expected.as_str()));
}

#[test]
fn format_detects_without_decoding() {
    let tmp = fixtures();
    let m = local_manipulator(tmp.path());
    assert_eq!(m.format("image.jpg").unwrap(), ImageFormat::Jpeg);
    assert_eq!(m.format("image.png").unwrap(), ImageFormat::Png);
}

#[test]
fn make_thumbnail_and_rotate_is_deterministic() {
    let tmp = fixtures();
    let m = local_manipulator(tmp.path());
    let request = params(&[("width", 100), ("height", 100), ("rotate", 90)]);

    let first = m.make("image.jpg", &request).unwrap();
    assert_eq!(first.dimensions(), (100, 100));
    let expected = tmp.path().join("image.jpg").display().to_string();
    assert_eq!(first.filepath(), Some(expected.as_str()));

    let second = m.make("image.jpg", &request).unwrap();
    assert_eq!(first.pixels().as_bytes(), second.pixels().as_bytes());
}

#[test]
fn make_calls_each_filter_once_in_precedence_order() {
    let tmp = fixtures();
    let rotate = Arc::new(Recording::default());
    let thumbnail = Arc::new(Recording::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    struct Ordered(&'static str, Arc<Recording>, Arc<Mutex<Vec<&'static str>>>);
    impl Filter for Ordered {
        fn apply(&self, image: Image, params: &FilterParams) -> Result<Image, FilterError> {
            self.2.lock().unwrap().push(self.0);
            self.1.apply(image, params)
        }
    }

    let mut registry = FilterRegistry::new();
    registry
        .register("rotate", Ordered("rotate", rotate.clone(), order.clone()))
        .register("thumbnail", Ordered("thumbnail", thumbnail.clone(), order.clone()));
    let m = ImageManipulator::new(Arc::new(registry))
        .with_source(Arc::new(LocalSource::new(tmp.path())));

    m.make(
        "image.jpg",
        &params(&[("width", 100), ("height", 100), ("rotate", 90)]),
    )
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["rotate", "thumbnail"]);
    assert_eq!(*rotate.calls.lock().unwrap(), vec!["degrees=90"]);
    assert_eq!(
        *thumbnail.calls.lock().unwrap(),
        vec!["height=100,width=100"]
    );
}

#[test]
fn save_then_open_keeps_size_and_format() {
    let tmp = fixtures();
    let m = local_manipulator(tmp.path());
    let image = m.open("image.jpg").unwrap();
    m.save(&image, "image-test.jpg").unwrap();

    assert!(tmp.path().join("image-test.jpg").is_file());
    let reopened = m.open("image-test.jpg").unwrap();
    assert_eq!(reopened.dimensions(), image.dimensions());
    assert_eq!(reopened.format(), image.format());
}

// =========================================================================
// Cache middleware
// =========================================================================

#[test]
fn existing_cache_file_short_circuits_handler() {
    let tmp = fixtures();
    let cache_dir = TempDir::new().unwrap();
    std::fs::write(cache_dir.path().join("image-image(10x10).jpg"), b"cached").unwrap();

    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler = Counting::new(TransformHandler::new(local_manipulator(tmp.path())));

    let response = cache
        .handle(&Request::new("image-image(10x10).jpg"), &handler)
        .unwrap();
    assert_eq!(handler.calls(), 0);
    assert_eq!(response.cache, Some(CacheStatus::Hit));
    assert_eq!(response.bytes(), Some(&b"cached"[..]));
}

#[test]
fn miss_then_hit_serves_identical_bytes() {
    let tmp = fixtures();
    let cache_dir = TempDir::new().unwrap();
    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler = Counting::new(TransformHandler::new(local_manipulator(tmp.path())));
    let request = Request::new("/image-image(100x100-rotate(90)).jpg");
    let cached = cache_dir.path().join("image-image(100x100-rotate(90)).jpg");

    assert!(!cached.exists());
    let miss = cache.handle(&request, &handler).unwrap();
    assert!(cached.is_file());
    assert_eq!(miss.cache, Some(CacheStatus::Miss));
    assert_eq!(miss.served_path.as_deref(), Some(cached.as_path()));

    let hit = cache.handle(&request, &handler).unwrap();
    assert_eq!(hit.cache, Some(CacheStatus::Hit));
    assert_eq!(handler.calls(), 1);
    assert_eq!(miss.bytes(), hit.bytes());
    assert_eq!(hit.bytes().unwrap(), std::fs::read(&cached).unwrap().as_slice());

    let decoded = image::load_from_memory(hit.bytes().unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 100));
}

#[test]
fn nested_cache_directories_are_created() {
    let tmp = fixtures();
    write_image(&tmp.path().join("a/b/c"), "deep.png", 20, 20, RawFormat::Png);
    let cache_dir = TempDir::new().unwrap();
    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler = TransformHandler::new(local_manipulator(tmp.path()));

    cache
        .handle(&Request::new("a/b/c/deep-image(10x10).png"), &handler)
        .unwrap();
    assert!(cache_dir.path().join("a/b/c/deep-image(10x10).png").is_file());
}

#[cfg(unix)]
#[test]
fn read_only_cache_directory_fails_and_writes_nothing() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = fixtures();
    let cache_dir = TempDir::new().unwrap();
    let locked = cache_dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler = TransformHandler::new(local_manipulator(tmp.path()));
    let result = cache.handle(&Request::new("locked/image-image(10x10).jpg"), &handler);

    let entries = std::fs::read_dir(&locked).unwrap().count();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(ImageError::CacheWrite { .. })));
    assert_eq!(entries, 0);
}

#[test]
fn unknown_filter_fails_and_writes_nothing() {
    let tmp = fixtures();
    let cache_dir = TempDir::new().unwrap();
    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler = TransformHandler::new(local_manipulator(tmp.path()));

    let err = cache
        .handle(&Request::new("x/image-image(sepia).jpg"), &handler)
        .unwrap_err();
    assert!(matches!(err, ImageError::UnknownFilter(ref n) if n == "sepia"));
    assert!(!cache_dir.path().join("x").exists());
}

#[test]
fn raw_handler_bodies_are_cached_verbatim() {
    let cache_dir = TempDir::new().unwrap();
    let cache = CacheMiddleware::new(cache_dir.path(), Quality::default());
    let handler =
        |_: &Request| -> Result<Response, ImageError> { Ok(Response::raw(b"verbatim".to_vec())) };

    cache.handle(&Request::new("docs/readme.txt"), &handler).unwrap();
    assert_eq!(
        std::fs::read(cache_dir.path().join("docs/readme.txt")).unwrap(),
        b"verbatim"
    );
}

// =========================================================================
// Service and config
// =========================================================================

#[test]
fn service_uses_route_cache_path_and_source() {
    let originals = fixtures();
    let public = TempDir::new().unwrap();
    let thumbs = TempDir::new().unwrap();

    let mut config = Config {
        public_path: public.path().to_path_buf(),
        ..Config::default()
    };
    config
        .sources
        .insert("local".into(), SourceConfig::local(public.path()));
    config
        .sources
        .insert("originals".into(), SourceConfig::local(originals.path()));
    config.routes.insert(
        "thumbs".into(),
        RouteConfig {
            cache_path: Some(thumbs.path().to_path_buf()),
            source: Some("originals".into()),
        },
    );
    config.validate().unwrap();

    let service = ImageService::from_config(config).unwrap();
    let response = service
        .render("image-image(50x50-crop).png", Some("thumbs"))
        .unwrap();
    assert_eq!(response.content_type(), "image/png");
    assert!(thumbs.path().join("image-image(50x50-crop).png").is_file());
    assert!(!public.path().join("image-image(50x50-crop).png").exists());

    // The default source has no originals
    let err = service.render("image-image(50x50).png", None).unwrap_err();
    assert!(matches!(err, ImageError::SourceNotFound(_)));
}

#[test]
fn local_source_is_a_trait_object() {
    let tmp = fixtures();
    let source: Arc<dyn Source> = Arc::new(LocalSource::new(tmp.path()));
    assert!(source.exists("image.png"));
    assert_eq!(source.read_header("image.png", 8).unwrap().len(), 8);
}
