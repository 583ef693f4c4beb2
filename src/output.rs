//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! cat-image(150x).png
//!     Cache: miss
//!     Served: public/cat-image(150x).png
//!     Type: image/png (18.2 KB)
//! ```
//!
//! ## Warm
//!
//! ```text
//! 001 hit   a-image(10x10).png
//! 002 miss  b-image(10x10).jpg
//! 003 FAIL  c-image(10x10).png
//!     Error: source image not found: c.png (404)
//!
//! Warmed 3 paths: 1 hit, 1 miss, 1 failed
//! ```
//!
//! ## Cache list
//!
//! ```text
//! public
//!     a-image(10x10).png  1.2 KB
//!     thumbs/b.jpg  820 B
//!
//! 2 files, 2.0 KB
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CachedFile;
use crate::imaging::ImageFormat;
use crate::request::{CacheStatus, Response};
use crate::service::WarmOutcome;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// render
// ============================================================================

pub fn format_render(path: &str, response: &Response) -> Vec<String> {
    let mut lines = vec![path.to_string()];
    if let Some(status) = response.cache {
        lines.push(format!("{}Cache: {}", indent(1), status));
    }
    if let Some(served) = &response.served_path {
        lines.push(format!("{}Served: {}", indent(1), served.display()));
    }
    let size = response
        .bytes()
        .map(|b| format!(" ({})", format_size(b.len() as u64)))
        .unwrap_or_default();
    lines.push(format!("{}Type: {}{}", indent(1), response.content_type(), size));
    lines
}

pub fn print_render(path: &str, response: &Response) {
    for line in format_render(path, response) {
        println!("{}", line);
    }
}

// ============================================================================
// warm
// ============================================================================

pub fn format_warm(outcomes: &[WarmOutcome]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut hits, mut misses, mut failed) = (0, 0, 0);

    for (i, outcome) in outcomes.iter().enumerate() {
        let label = match &outcome.result {
            Ok(CacheStatus::Hit) => {
                hits += 1;
                "hit "
            }
            Ok(CacheStatus::Miss) => {
                misses += 1;
                "miss"
            }
            Err(_) => {
                failed += 1;
                "FAIL"
            }
        };
        lines.push(format!("{} {}  {}", format_index(i + 1), label, outcome.path));
        if let Err(e) = &outcome.result {
            lines.push(format!(
                "{}Error: {} ({})",
                indent(1),
                e,
                e.status().as_u16()
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Warmed {}: {}, {}, {} failed",
        plural(outcomes.len(), "path"),
        plural(hits, "hit"),
        if misses == 1 {
            "1 miss".to_string()
        } else {
            format!("{misses} misses")
        },
        failed
    ));
    lines
}

pub fn print_warm(outcomes: &[WarmOutcome]) {
    for line in format_warm(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// format / filters
// ============================================================================

pub fn format_detected(path: &str, format: ImageFormat) -> String {
    format!("{path}: {} ({})", format.name(), format.mime_type())
}

pub fn format_filters(names: &[&str]) -> Vec<String> {
    let mut lines = vec!["Filters".to_string()];
    lines.extend(names.iter().map(|n| format!("{}{}", indent(1), n)));
    lines
}

pub fn print_filters(names: &[&str]) {
    for line in format_filters(names) {
        println!("{}", line);
    }
}

// ============================================================================
// cache-list
// ============================================================================

pub fn format_cache_list(root: &Path, entries: &[CachedFile]) -> Vec<String> {
    let mut lines = vec![root.display().to_string()];
    if entries.is_empty() {
        lines.push(format!("{}(empty)", indent(1)));
        return lines;
    }
    for entry in entries {
        lines.push(format!(
            "{}{}  {}",
            indent(1),
            entry.key,
            format_size(entry.size)
        ));
    }
    let total: u64 = entries.iter().map(|e| e.size).sum();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(entries.len(), "file"),
        format_size(total)
    ));
    lines
}

pub fn print_cache_list(root: &Path, entries: &[CachedFile]) {
    for line in format_cache_list(root, entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
