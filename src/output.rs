//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every photo is shown by its positional index and filename first, with the
//! full source URL as an indented `Source:` line beneath it. Verdicts and
//! statuses follow as further indented context lines.
//!
//! # Output Format
//!
//! ## Analyze
//!
//! ```text
//! Analysis
//! 001 kitchen.jpg (2000x1500)
//!     Source: https://photos.example.com/listing/kitchen.jpg
//!     Strips: flagged
//!     Resolution: ok
//!     Warning: Adjust Shape
//! 002 (unreadable) porch.jpg
//!     Source: https://photos.example.com/listing/porch.jpg
//! ```
//!
//! ## Package
//!
//! ```text
//! Package (3 photos)
//!     001 kitchen.jpg
//!         Overlay skipped: https://cdn.example.com/agent.png
//!     002 porch.jpg: placeholder
//!     003 yard.jpg
//!
//! Generated 3 images → out/
//! Warning: 1 image could not be processed. Placeholders used.
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure.

use crate::imaging::display_name;
use crate::package::PackageEvent;
use crate::session::ImageWarning;
use crate::types::{ImageAnalysisResult, ImageEditState, PackageResult};
use std::path::Path;

/// Filenames in listings are shown up to this many characters.
const NAME_WIDTH: usize = 40;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn image_line(index: usize, url: &str) -> String {
    format!("{} {}", format_index(index), display_name(url, NAME_WIDTH))
}

fn flag(value: Option<bool>, flagged: &'static str) -> &'static str {
    match value {
        Some(true) => flagged,
        Some(false) => "ok",
        None => "unknown",
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

// ============================================================================
// Analyze
// ============================================================================

/// Format analysis verdicts, one entry per photo in input order.
pub fn format_analysis(results: &[(String, ImageAnalysisResult)]) -> Vec<String> {
    let mut lines = vec!["Analysis".to_string()];
    for (pos, (url, result)) in results.iter().enumerate() {
        let index = pos + 1;
        let header = match result.dimensions() {
            Some((w, h)) => format!("{} ({}x{})", image_line(index, url), w, h),
            None if result.is_indeterminate() => format!(
                "{} (unreadable) {}",
                format_index(index),
                display_name(url, NAME_WIDTH)
            ),
            None => image_line(index, url),
        };
        lines.push(header);
        lines.push(format!("{}Source: {}", indent(1), url));
        if result.is_indeterminate() {
            continue;
        }
        lines.push(format!(
            "{}Strips: {}",
            indent(1),
            flag(result.has_significant_strips, "flagged")
        ));
        lines.push(format!(
            "{}Resolution: {}",
            indent(1),
            flag(result.is_potentially_low_resolution, "low")
        ));
        if let Some(label) = ImageWarning::from_analysis(result).label() {
            lines.push(format!("{}Warning: {}", indent(1), label));
        }
    }
    lines
}

pub fn print_analysis(results: &[(String, ImageAnalysisResult)]) {
    for line in format_analysis(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Package
// ============================================================================

/// Format a single package progress event as display lines.
pub fn format_package_event(event: &PackageEvent) -> Vec<String> {
    match event {
        PackageEvent::Started { total } => {
            vec![format!("Package ({})", plural(*total, "photo"))]
        }
        PackageEvent::ImageComposed {
            index,
            url,
            source_failed,
            skipped_overlays,
            ..
        } => {
            let mut lines = Vec::new();
            let line = image_line(index + 1, url);
            if *source_failed {
                lines.push(format!("{}{}: placeholder", indent(1), line));
            } else {
                lines.push(format!("{}{}", indent(1), line));
            }
            for overlay in skipped_overlays {
                lines.push(format!("{}Overlay skipped: {}", indent(2), overlay));
            }
            lines
        }
    }
}

/// Format the closing summary after a package has been written to `out_dir`.
pub fn format_package_summary(result: &PackageResult, out_dir: &Path) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Generated {} \u{2192} {}",
            plural(result.successful_images.len(), "image"),
            out_dir.display()
        ),
    ];
    if result.has_failures() {
        let failed = result.failed_image_original_urls.len();
        lines.push(format!(
            "Warning: {} could not be processed. Placeholders used.",
            plural(failed, "image")
        ));
        for url in &result.failed_image_original_urls {
            lines.push(format!("{}{}", indent(1), url));
        }
    }
    lines
}

pub fn print_package_summary(result: &PackageResult, out_dir: &Path) {
    for line in format_package_summary(result, out_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Auto-adjust
// ============================================================================

pub fn format_auto_adjust(state: &ImageEditState) -> Vec<String> {
    let mut lines = vec![format!("Auto-adjust (zoom {})", state.zoom)];
    if let Some(area) = state.cropped_area_pixels {
        lines.push(format!(
            "{}x={:.2} y={:.2} width={:.2} height={:.2}",
            indent(1),
            area.x,
            area.y,
            area.width,
            area.height
        ));
    }
    lines
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::auto_adjust;

    const URL: &str = "https://photos.example.com/listing/kitchen.jpg";

    #[test]
    fn analysis_lists_verdicts() {
        let results = vec![(
            URL.to_string(),
            ImageAnalysisResult {
                has_significant_strips: Some(true),
                is_potentially_low_resolution: Some(false),
                natural_width: Some(2000),
                natural_height: Some(1500),
            },
        )];
        let lines = format_analysis(&results);
        assert_eq!(
            lines,
            vec![
                "Analysis",
                "001 kitchen.jpg (2000x1500)",
                "    Source: https://photos.example.com/listing/kitchen.jpg",
                "    Strips: flagged",
                "    Resolution: ok",
                "    Warning: Adjust Shape",
            ]
        );
    }

    #[test]
    fn indeterminate_analysis_is_marked_unreadable() {
        let results = vec![(URL.to_string(), ImageAnalysisResult::indeterminate())];
        let lines = format_analysis(&results);
        assert_eq!(lines[1], "001 (unreadable) kitchen.jpg");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn strips_only_verdict_shows_unknown_resolution() {
        let results = vec![(
            URL.to_string(),
            ImageAnalysisResult {
                has_significant_strips: Some(true),
                ..Default::default()
            },
        )];
        let lines = format_analysis(&results);
        assert_eq!(lines[1], "001 kitchen.jpg");
        assert!(lines.contains(&"    Resolution: unknown".to_string()));
    }

    #[test]
    fn package_events_format() {
        assert_eq!(
            format_package_event(&PackageEvent::Started { total: 1 }),
            vec!["Package (1 photo)"]
        );
        let lines = format_package_event(&PackageEvent::ImageComposed {
            index: 1,
            total: 3,
            url: URL.into(),
            source_failed: true,
            skipped_overlays: vec!["https://cdn.test/o.png".into()],
        });
        assert_eq!(
            lines,
            vec![
                "    002 kitchen.jpg: placeholder",
                "        Overlay skipped: https://cdn.test/o.png",
            ]
        );
    }

    #[test]
    fn summary_warns_about_failures() {
        let result = PackageResult {
            successful_images: vec!["a".into(), "b".into()],
            failed_image_original_urls: vec![URL.into()],
            ..Default::default()
        };
        let lines = format_package_summary(&result, Path::new("out"));
        assert_eq!(lines[1], "Generated 2 images \u{2192} out");
        assert_eq!(
            lines[2],
            "Warning: 1 image could not be processed. Placeholders used."
        );
    }

    #[test]
    fn auto_adjust_prints_rectangle() {
        let analysis = ImageAnalysisResult {
            natural_width: Some(1000),
            natural_height: Some(1000),
            ..Default::default()
        };
        let state = auto_adjust(Some(&analysis), 2.0).unwrap();
        assert_eq!(
            format_auto_adjust(&state),
            vec![
                "Auto-adjust (zoom 2)",
                "    x=250.00 y=250.00 width=500.00 height=500.00",
            ]
        );
    }
}
