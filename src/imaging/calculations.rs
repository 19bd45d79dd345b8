//! Pure calculation functions for crop geometry and image checks.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::types::CropArea;

/// An integer pixel rectangle, guaranteed non-empty and inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered square covering the shorter edge.
///
/// ```
/// # use listing_pack::imaging::default_crop;
/// let crop = default_crop(2000, 1500);
/// assert_eq!((crop.x, crop.y, crop.width), (250.0, 0.0, 1500.0));
/// ```
pub fn default_crop(width: u32, height: u32) -> CropArea {
    let size = width.min(height) as f64;
    CropArea {
        x: (width as f64 - size) / 2.0,
        y: (height as f64 - size) / 2.0,
        width: size,
        height: size,
    }
}

/// Default crop shrunk by `zoom` and re-centered within that square.
///
/// Approximates what a user zooming in by `zoom` on the crop editor would
/// confirm, which trims thin padding bands at the edges.
pub fn auto_adjust_crop(width: u32, height: u32, zoom: f64) -> CropArea {
    let square = default_crop(width, height);
    let zoom = if zoom > 0.0 { zoom } else { 1.0 };
    let shrunk_w = square.width / zoom;
    let shrunk_h = square.height / zoom;
    CropArea {
        x: square.x + (square.width - shrunk_w) / 2.0,
        y: square.y + (square.height - shrunk_h) / 2.0,
        width: shrunk_w,
        height: shrunk_h,
    }
}

/// Snap a fractional crop to whole pixels and clip it to the image bounds.
///
/// Returns `None` when nothing of the crop lies inside the image.
pub fn clamp_crop(crop: &CropArea, width: u32, height: u32) -> Option<PixelRect> {
    let values = [crop.x, crop.y, crop.width, crop.height];
    if values.iter().any(|v| !v.is_finite()) || crop.width <= 0.0 || crop.height <= 0.0 {
        return None;
    }
    let x0 = crop.x.round().clamp(0.0, width as f64) as u32;
    let y0 = crop.y.round().clamp(0.0, height as f64) as u32;
    let x1 = (crop.x + crop.width).round().clamp(0.0, width as f64) as u32;
    let y1 = (crop.y + crop.height).round().clamp(0.0, height as f64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Where a crop lands on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlacement {
    /// Part of the source inside both the crop and the image.
    pub source: PixelRect,
    /// Canvas rectangle that part maps to.
    pub dest: PixelRect,
}

/// Map a crop onto a `target_width x target_height` canvas.
///
/// The full crop rectangle spans the canvas; only its overlap with the image
/// is drawn, at the proportional position. Returns `None` when nothing would
/// be drawn.
pub fn place_crop(
    crop: &CropArea,
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> Option<CropPlacement> {
    let source = clamp_crop(crop, width, height)?;
    let scale_x = target_width as f64 / crop.width;
    let scale_y = target_height as f64 / crop.height;
    let map = |v: u32, origin: f64, scale: f64, limit: u32| {
        ((v as f64 - origin) * scale).round().clamp(0.0, limit as f64) as u32
    };
    let x0 = map(source.x, crop.x, scale_x, target_width);
    let x1 = map(source.x + source.width, crop.x, scale_x, target_width);
    let y0 = map(source.y, crop.y, scale_y, target_height);
    let y1 = map(source.y + source.height, crop.y, scale_y, target_height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(CropPlacement {
        source,
        dest: PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        },
    })
}

/// True when either edge is below `factor` of the reference dimension.
pub fn is_low_resolution(width: u32, height: u32, reference: u32, factor: f64) -> bool {
    let threshold = reference as f64 * factor;
    (width as f64) < threshold || (height as f64) < threshold
}

/// Number of rows to inspect from each edge: a fraction of the height, but
/// never fewer than `min_rows`.
pub fn scan_row_count(height: u32, fraction: f64, min_rows: u32) -> u32 {
    let by_fraction = (height as f64 * fraction).floor() as u32;
    by_fraction.max(min_rows)
}

/// Horizontal sample columns for the given width ratios, clamped to the image.
pub fn sample_columns(width: u32, ratios: &[f64]) -> Vec<u32> {
    let last = width.saturating_sub(1);
    ratios
        .iter()
        .map(|ratio| ((width as f64 * ratio).floor().max(0.0) as u32).min(last))
        .collect()
}

/// Filename portion of a URL (after the last `/`), truncated to `max_chars`
/// characters with a trailing `...`.
pub fn display_name(url: &str, max_chars: usize) -> String {
    let name = url.rsplit('/').next().unwrap_or(url);
    if name.chars().count() > max_chars {
        let head: String = name.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}
