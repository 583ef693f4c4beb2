//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve a requested bounding box where either side may be omitted.
///
/// A missing side is derived from the source aspect ratio; if both are
/// missing the source size is returned unchanged.
///
/// # Examples
/// ```
/// # use imagecache::imaging::calculations::resolve_box;
/// assert_eq!(resolve_box((300, 200), Some(150), None), (150, 100));
/// assert_eq!(resolve_box((300, 200), None, Some(50)), (75, 50));
/// ```
pub fn resolve_box(source: (u32, u32), width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let (src_w, src_h) = source;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale(src_h, w, src_w)),
        (None, Some(h)) => (scale(src_w, h, src_h), h),
        (None, None) => source,
    }
}

/// Largest size that fits inside `bounds` while keeping the source aspect
/// ratio. Never upscales: a source already inside the box is returned as is.
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    (
        ((src_w as f64 * ratio).round() as u32).max(1),
        ((src_h as f64 * ratio).round() as u32).max(1),
    )
}

/// Centered region of `source`, as `(x, y, width, height)`, with the aspect
/// ratio of `target`. Cropping this region and then resizing it to `target`
/// fills the box exactly without ever holding a buffer larger than either.
pub fn calculate_crop_region(source: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    if (src_w as u64) * (tgt_h as u64) > (tgt_w as u64) * (src_h as u64) {
        // Source is wider: keep full height, trim the sides
        let w = scale(src_h, tgt_w, tgt_h).min(src_w);
        (src_w.saturating_sub(w) / 2, 0, w, src_h)
    } else {
        // Source is taller (or equal): keep full width, trim top and bottom
        let h = scale(src_w, tgt_h, tgt_w).min(src_h);
        (0, src_h.saturating_sub(h) / 2, src_w, h)
    }
}

fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value;
    }
    ((value as f64 * numerator as f64 / denominator as f64).round() as u32).max(1)
}
