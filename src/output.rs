//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (image, filter, scale mode) leads with its identity: a
//! positional index and a name. Paths and parameters follow as indented
//! context lines, so output reads as an inventory first and a log second.
//!
//! # Output Format
//!
//! ## Batch
//!
//! ```text
//! Rendering 3 images
//! 001 dawn.jpg
//!     Source: photos/dawn.jpg
//!     Output: out/dawn.png (rendered)
//! 002 broken.png
//!     Source: photos/broken.png
//!     Error: Processing failed: ...
//! ```
//!
//! ## Filters
//!
//! ```text
//! 001 contrast
//!     Key: 5d1c...
//! 002 bayer-two-dithering:200,false
//!     Key: 09af...
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and, where the CLI needs it, a `print_*` wrapper that writes
//! to stdout. Format functions are pure: no I/O, no side effects.

use crate::batch::BatchEvent;
use crate::filter::{FilterKind, FilterList, Transformation};
use crate::imaging::ScaleMode;
use crate::notify::{Toast, ToastIcon};
use crate::session::SessionEvent;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Shorten a hex key for display.
fn short_key(key: &str) -> &str {
    &key[..key.len().min(12)]
}

// ============================================================================
// Toasts
// ============================================================================

pub fn format_toast(toast: &Toast) -> Vec<String> {
    let tag = match toast.icon {
        ToastIcon::Save => "saved",
        ToastIcon::Error => "error",
    };
    vec![format!("[{}] {}", tag, toast.message)]
}

/// The review request shown after the `saves`-th successful save.
pub fn format_review_prompt(saves: u32) -> Vec<String> {
    vec![format!(
        "[review] {} saves so far. Enjoying retouch? Consider leaving a review.",
        saves
    )]
}

pub fn print_review_prompt(saves: u32) {
    for line in format_review_prompt(saves) {
        println!("{}", line);
    }
}

// ============================================================================
// Session events
// ============================================================================

pub fn format_session_event(event: &SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::FilterAdded { index, filter } => {
            vec![format!("+ {} {}", format_index(index + 1), filter)]
        }
        SessionEvent::FilterUpdated { index, filter } => {
            vec![format!("~ {} {}", format_index(index + 1), filter)]
        }
        SessionEvent::FilterRemoved { index, filter } => {
            vec![format!("- {} {}", format_index(index + 1), filter)]
        }
        SessionEvent::OrderChanged { filters } => {
            let mut lines = vec!["Order changed".to_string()];
            lines.extend(
                filters
                    .iter()
                    .enumerate()
                    .map(|(i, f)| format!("{}{} {}", indent(1), format_index(i + 1), f)),
            );
            lines
        }
        SessionEvent::Rendered { size, cache_key } => {
            vec![format!("Rendered {} [{}]", size, short_key(cache_key))]
        }
        SessionEvent::Failed { message } => vec![format!("Error: {}", message)],
    }
}

// ============================================================================
// Batch events
// ============================================================================

pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Rendering {} {}", total, noun)]
        }
        BatchEvent::ImageRendered {
            index,
            source,
            output,
            status,
        } => vec![
            format!("{} {}", format_index(index + 1), file_name(source)),
            format!("{}Source: {}", indent(1), source.display()),
            format!("{}Output: {} ({})", indent(1), output.display(), status),
        ],
        BatchEvent::ImageFailed {
            index,
            source,
            error,
        } => vec![
            format!("{} {}", format_index(index + 1), file_name(source)),
            format!("{}Source: {}", indent(1), source.display()),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

// ============================================================================
// Catalogs
// ============================================================================

/// Every filter kind with its default parameters, in the text form the
/// `-f` flag accepts.
pub fn format_filter_catalog() -> Vec<String> {
    FilterKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            format!(
                "{} {:<28} default: {}",
                format_index(i + 1),
                kind.name(),
                kind.default_filter()
            )
        })
        .collect()
}

pub fn print_filter_catalog() {
    for line in format_filter_catalog() {
        println!("{}", line);
    }
}

/// The scale-mode picklist with integer codes.
pub fn format_scale_modes() -> Vec<String> {
    ScaleMode::ENTRIES
        .iter()
        .map(|mode| {
            let resolved = mode.resolve();
            if resolved == *mode {
                format!("{:>3} {}", mode.value(), mode)
            } else {
                format!("{:>3} {} (= {})", mode.value(), mode, resolved)
            }
        })
        .collect()
}

pub fn print_scale_modes() {
    for line in format_scale_modes() {
        println!("{}", line);
    }
}

/// A filter stack with each member's key, followed by the list key.
pub fn format_filter_list(filters: &FilterList) -> Vec<String> {
    let mut lines = Vec::new();
    if filters.is_empty() {
        lines.push("(no filters)".to_string());
    }
    for (i, filter) in filters.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), filter));
        lines.push(format!("{}Key: {}", indent(1), filter.cache_key()));
    }
    lines.push(format!("List key: {}", filters.cache_key()));
    lines
}

pub fn print_filter_list(filters: &FilterList) {
    for line in format_filter_list(filters) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStatus;
    use crate::filter::Filter;
    use crate::imaging::IntegerSize;
    use std::path::PathBuf;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn toast_lines() {
        assert_eq!(format_toast(&Toast::saved("Saved")), vec!["[saved] Saved"]);
        assert_eq!(
            format_toast(&Toast::error("Something went wrong: x")),
            vec!["[error] Something went wrong: x"]
        );
    }

    #[test]
    fn review_prompt_line() {
        assert_eq!(
            format_review_prompt(10),
            vec!["[review] 10 saves so far. Enjoying retouch? Consider leaving a review."]
        );
    }

    // =========================================================================
    // Event formatting
    // =========================================================================

    #[test]
    fn batch_rendered_event() {
        let event = BatchEvent::ImageRendered {
            index: 0,
            source: PathBuf::from("photos/dawn.jpg"),
            output: PathBuf::from("out/dawn.png"),
            status: CacheStatus::Copied,
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "001 dawn.jpg",
                "    Source: photos/dawn.jpg",
                "    Output: out/dawn.png (copied)",
            ]
        );
    }

    #[test]
    fn batch_failed_and_started_events() {
        let failed = BatchEvent::ImageFailed {
            index: 4,
            source: PathBuf::from("b.png"),
            error: "boom".into(),
        };
        assert_eq!(format_batch_event(&failed)[2], "    Error: boom");
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Rendering 1 image"]
        );
    }

    #[test]
    fn session_events() {
        let added = SessionEvent::FilterAdded {
            index: 0,
            filter: Filter::Contrast { value: 1.5 },
        };
        assert_eq!(format_session_event(&added), vec!["+ 001 contrast:1.5"]);

        let rendered = SessionEvent::Rendered {
            size: IntegerSize::new(10, 5),
            cache_key: "0123456789abcdef".into(),
        };
        assert_eq!(
            format_session_event(&rendered),
            vec!["Rendered 10x5 [0123456789ab]"]
        );
    }

    // =========================================================================
    // Catalogs
    // =========================================================================

    #[test]
    fn filter_catalog_lists_every_kind() {
        let lines = format_filter_catalog();
        assert_eq!(lines.len(), FilterKind::ALL.len());
        assert!(lines[0].starts_with("001 brightness"));
        assert!(lines.iter().any(|l| l.contains("bayer-two-dithering:200,false")));
    }

    #[test]
    fn scale_modes_show_codes() {
        let lines = format_scale_modes();
        assert_eq!(lines.len(), ScaleMode::ENTRIES.len());
        assert_eq!(lines[0], " -1 default (= bilinear)");
        assert_eq!(lines[1], "  0 bilinear");
    }

    #[test]
    fn filter_list_shows_keys() {
        let list = FilterList::from(vec![Filter::Negative]);
        let lines = format_filter_list(&list);
        assert_eq!(lines[0], "001 negative");
        assert!(lines[1].starts_with("    Key: "));
        assert_eq!(lines[2], format!("List key: {}", list.cache_key()));
    }

    #[test]
    fn empty_filter_list() {
        let lines = format_filter_list(&FilterList::new());
        assert_eq!(lines[0], "(no filters)");
        assert_eq!(lines.len(), 2);
    }
}
