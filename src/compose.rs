//! Composition engine: one source photo in, one square PNG data URL out.
//!
//! ```text
//!  white canvas ─► crop source ─► scale to target ─► branding? ─► closing? ─► PNG
//!                     │
//!                     └─ load/decode fails ─► gray placeholder + caption ─► PNG
//! ```
//!
//! The crop comes from the edit state when the user (or auto-adjust) has
//! confirmed one, and is otherwise the centered square over the shorter edge.
//! The crop rectangle spans the whole canvas. Where it overhangs the source
//! the white base shows through; the overlapping region is scaled into its
//! proportional place, never stretched to cover the gap.
//!
//! Overlays are full-canvas images drawn over the base. An overlay that fails
//! to load is logged and skipped. Only a failure of the source itself
//! produces the placeholder, and no overlays are drawn on a placeholder.
//!
//! [`compose`] never fails. Even a placeholder that cannot be encoded falls
//! back to a constant 1×1 gray PNG.

use crate::config::CompositionConfig;
use crate::imaging::{
    TargetSize, auto_adjust_crop, default_crop, display_name, encode_png, place_crop, text,
};
use crate::loader::{ImageLoadError, ImageLoader, LoadOptions};
use crate::types::{BrandingOverlay, ImageAnalysisResult, ImageEditState, Point};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, error, warn};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// 1×1 light-gray PNG, used when even the placeholder cannot be encoded.
pub const FALLBACK_PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGO4fPnyfwAIbwN55C+AlwAAAABJRU5ErkJggg==";

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER_FILL: Rgba<u8> = Rgba([211, 211, 211, 255]);
const PLACEHOLDER_INK: Rgba<u8> = Rgba([255, 0, 0, 255]);
const PLACEHOLDER_CAPTION: &str = "Error Processing Image";

/// Overlays for one position in the package.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlays<'o> {
    /// Agent or team branding; set only for the first image.
    pub branding: Option<&'o BrandingOverlay>,
    /// Fixed closing overlay URL; set only for the last image.
    pub closing: Option<&'o str>,
}

/// Result of composing one image.
#[derive(Debug, Clone)]
pub struct Composition {
    pub data_url: String,
    /// The source could not be rendered and `data_url` is a placeholder.
    pub source_failed: bool,
    /// Human-readable reason for the placeholder.
    pub failure: Option<String>,
    /// URLs of overlays that were skipped.
    pub overlay_failures: Vec<String>,
}

#[derive(Error, Debug)]
enum CompositionFailure {
    #[error(transparent)]
    Load(#[from] ImageLoadError),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug, PartialEq)]
pub enum AutoAdjustError {
    #[error("natural dimensions are unknown; open the manual editor")]
    DimensionsUnknown,
    #[error("image has an empty edge ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Render one package image. Never fails; see the module docs.
pub fn compose(
    loader: &ImageLoader<'_>,
    config: &CompositionConfig,
    url: &str,
    edit: Option<&ImageEditState>,
    overlays: Overlays<'_>,
    target: TargetSize,
) -> Composition {
    let rendered = render_base(loader, url, edit, target).and_then(|mut canvas| {
        let mut overlay_failures = Vec::new();
        if let Some(branding) = overlays.branding {
            let overlay_url = branding.overlay_url();
            if let Err(err) = draw_overlay(loader, &mut canvas, overlay_url) {
                error!(url, kind = branding.kind(), overlay = overlay_url, error = %err, "branding overlay skipped");
                overlay_failures.push(overlay_url.to_string());
            }
        }
        if let Some(closing) = overlays.closing {
            if let Err(err) = draw_overlay(loader, &mut canvas, closing) {
                error!(url, overlay = closing, error = %err, "closing overlay skipped");
                overlay_failures.push(closing.to_string());
            }
        }
        Ok((to_data_url(&canvas)?, overlay_failures))
    });

    match rendered {
        Ok((data_url, overlay_failures)) => Composition {
            data_url,
            source_failed: false,
            failure: None,
            overlay_failures,
        },
        Err(err) => {
            error!(url, error = %err, "rendering placeholder");
            Composition {
                data_url: placeholder_data_url(url, target, config),
                source_failed: true,
                failure: Some(err.to_string()),
                overlay_failures: Vec::new(),
            }
        }
    }
}

fn render_base(
    loader: &ImageLoader<'_>,
    url: &str,
    edit: Option<&ImageEditState>,
    target: TargetSize,
) -> Result<RgbaImage, CompositionFailure> {
    let mut canvas = RgbaImage::from_pixel(target.width, target.height, BACKGROUND);
    let options = LoadOptions::sharpened(edit.and_then(|e| e.sharpness));
    let source = loader.load(url, options)?.bitmap;
    let (width, height) = source.dimensions();

    let crop = edit
        .and_then(|e| e.cropped_area_pixels)
        .unwrap_or_else(|| default_crop(width, height));
    let Some(placement) = place_crop(&crop, width, height, target.width, target.height) else {
        warn!(url, ?crop, width, height, "crop does not overlap the source");
        return Ok(canvas);
    };
    debug!(url, ?placement, "cropping");

    let (src, dest) = (placement.source, placement.dest);
    let region = imageops::crop_imm(&source, src.x, src.y, src.width, src.height).to_image();
    let scaled = imageops::resize(&region, dest.width, dest.height, FilterType::Lanczos3);
    imageops::overlay(&mut canvas, &scaled, dest.x as i64, dest.y as i64);
    Ok(canvas)
}

fn draw_overlay(
    loader: &ImageLoader<'_>,
    canvas: &mut RgbaImage,
    overlay_url: &str,
) -> Result<(), ImageLoadError> {
    let overlay = loader.load(overlay_url, LoadOptions::default())?.bitmap;
    let (width, height) = canvas.dimensions();
    let scaled = if overlay.dimensions() == (width, height) {
        overlay
    } else {
        imageops::resize(&overlay, width, height, FilterType::Triangle)
    };
    imageops::overlay(canvas, &scaled, 0, 0);
    Ok(())
}

/// Light-gray error card with a red caption and the source's filename.
pub fn render_placeholder(url: &str, target: TargetSize, config: &CompositionConfig) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(target.width, target.height, PLACEHOLDER_FILL);
    let center_x = (target.width / 2) as i32;
    let center_y = (target.height / 2) as i32;
    let caption_scale = (target.height / 540).max(1);
    let name_scale = caption_scale.saturating_sub(1).max(1);

    text::draw_centered(
        &mut canvas,
        center_x,
        center_y - 10 - (8 * caption_scale) as i32,
        PLACEHOLDER_CAPTION,
        PLACEHOLDER_INK,
        caption_scale,
        true,
    );
    text::draw_centered(
        &mut canvas,
        center_x,
        center_y + 10 - (8 * name_scale) as i32,
        &display_name(url, config.caption_max_chars),
        PLACEHOLDER_INK,
        name_scale,
        false,
    );
    canvas
}

fn placeholder_data_url(url: &str, target: TargetSize, config: &CompositionConfig) -> String {
    match to_data_url(&render_placeholder(url, target, config)) {
        Ok(data_url) => data_url,
        Err(err) => {
            warn!(url, error = %err, "placeholder encoding failed, using 1x1 fallback");
            FALLBACK_PNG_DATA_URL.to_string()
        }
    }
}

fn to_data_url(canvas: &RgbaImage) -> Result<String, CompositionFailure> {
    let png = encode_png(canvas)?;
    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(png)))
}

/// Decode the PNG bytes behind a data URL produced by [`compose`].
pub fn png_from_data_url(data_url: &str) -> Option<Vec<u8>> {
    let payload = data_url.strip_prefix(DATA_URL_PREFIX)?;
    STANDARD.decode(payload).ok()
}

/// Non-interactive crop that trims thin edge bands.
///
/// Needs natural dimensions from a prior analysis; without them it refuses
/// rather than guessing, and the caller should open the manual editor.
pub fn auto_adjust(
    analysis: Option<&ImageAnalysisResult>,
    zoom: f64,
) -> Result<ImageEditState, AutoAdjustError> {
    let (width, height) = analysis
        .and_then(|a| a.dimensions())
        .ok_or(AutoAdjustError::DimensionsUnknown)?;
    if width == 0 || height == 0 {
        return Err(AutoAdjustError::EmptyImage { width, height });
    }
    Ok(ImageEditState {
        crop: Point::default(),
        zoom,
        cropped_area_pixels: Some(auto_adjust_crop(width, height, zoom)),
        sharpness: None,
        auto_adjusted: true,
    })
}
