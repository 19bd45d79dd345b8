//! Pre-flight image analysis.
//!
//! Runs over every candidate photo before the user edits anything and
//! produces an [`ImageAnalysisResult`] per URL:
//!
//! - **Strip artifacts**: near-white letterbox bands some listing sources add
//!   to force a non-native aspect ratio. A square crop would silently keep
//!   them, so they are flagged up front.
//! - **Low resolution**: either natural edge below
//!   `reference_dimension * low_resolution_factor` (864px by default).
//! - **Natural dimensions**, needed later by auto-adjust.
//!
//! ## Strip scan
//!
//! ```text
//!   row 0  ░░░░░░░░░░░░░░░░░░░░   ← walk down while rows are white
//!          ░░░░░░░░░░░░░░░░░░░░
//!          ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓   ← first non-white row stops the walk
//!          ...
//!          ░░░░░░░░░░░░░░░░░░░░   ← walk up from the last row likewise
//! ```
//!
//! A row is white when enough of its sample columns are near white and
//! opaque. Each walk is capped at `max(min_scan_rows, height * scan_fraction)`
//! rows. Strips are significant when the two walks together cover at least
//! `significant_strip_fraction` of the height.
//!
//! ## Failure policy
//!
//! Analysis never returns an error. Each way it can fail maps to a named
//! [`AnalysisFallback`] with a fixed, deliberately cautious result, so a bad
//! photo shows up as "needs review" rather than as silently fine.

use crate::config::AnalysisConfig;
use crate::imaging::{BackendError, Dimensions, is_low_resolution, sample_columns, scan_row_count};
use crate::loader::{ImageLoader, LoadFailure, LoadOptions};
use crate::types::ImageAnalysisResult;
use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Outcome of the edge walk on one bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripScan {
    pub top_rows: u32,
    pub bottom_rows: u32,
    pub significant: bool,
}

/// The ways analysis can fall short of a full verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisFallback {
    /// The mirror could not produce a loadable URL. Strips are flagged so
    /// the image is reviewed; nothing else is known.
    ProxyUnavailable,
    /// The bytes could not be fetched, identified or decoded. Nothing is
    /// known, not even dimensions from a header that parsed.
    SourceUnreadable,
    /// The image reports a zero-sized edge. Nothing to flag.
    EmptyBitmap(Dimensions),
    /// Dimensions are known and the data is intact, but the backend will not
    /// hand back pixels (for example the decode budget is exceeded). Strips
    /// are flagged; resolution is judged from the dimensions.
    PixelSamplingUnavailable(Dimensions),
}

impl AnalysisFallback {
    pub fn result(self, config: &AnalysisConfig) -> ImageAnalysisResult {
        match self {
            Self::ProxyUnavailable => ImageAnalysisResult {
                has_significant_strips: Some(true),
                ..ImageAnalysisResult::indeterminate()
            },
            Self::SourceUnreadable => ImageAnalysisResult::indeterminate(),
            Self::EmptyBitmap(dims) => ImageAnalysisResult {
                has_significant_strips: Some(false),
                is_potentially_low_resolution: Some(false),
                natural_width: Some(dims.width),
                natural_height: Some(dims.height),
            },
            Self::PixelSamplingUnavailable(dims) => ImageAnalysisResult {
                has_significant_strips: Some(true),
                is_potentially_low_resolution: Some(low_resolution(dims, config)),
                natural_width: Some(dims.width),
                natural_height: Some(dims.height),
            },
        }
    }
}

fn low_resolution(dims: Dimensions, config: &AnalysisConfig) -> bool {
    is_low_resolution(
        dims.width,
        dims.height,
        config.reference_dimension,
        config.low_resolution_factor,
    )
}

/// Walk inward from both edges counting consecutive white rows.
pub fn scan_strips(bitmap: &RgbaImage, config: &AnalysisConfig) -> StripScan {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return StripScan {
            top_rows: 0,
            bottom_rows: 0,
            significant: false,
        };
    }
    let limit = scan_row_count(height, config.scan_fraction, config.min_scan_rows).min(height);
    let columns = sample_columns(width, &config.sample_points);

    let is_white_row = |y: u32| {
        let white = columns
            .iter()
            .filter(|&&x| {
                let [r, g, b, a] = bitmap.get_pixel(x, y).0;
                r >= config.white_threshold
                    && g >= config.white_threshold
                    && b >= config.white_threshold
                    && a >= config.alpha_threshold
            })
            .count();
        white as f64 / columns.len() as f64 >= config.row_white_fraction
    };

    let top_rows = (0..limit).take_while(|&y| is_white_row(y)).count() as u32;
    let bottom_rows = (0..limit)
        .map(|offset| height - 1 - offset)
        .take_while(|&y| is_white_row(y))
        .count() as u32;

    let covered = (top_rows + bottom_rows) as f64 / height as f64;
    StripScan {
        top_rows,
        bottom_rows,
        significant: (top_rows > 0 || bottom_rows > 0)
            && covered >= config.significant_strip_fraction,
    }
}

/// Analyze one image. Never fails; see [`AnalysisFallback`].
pub fn analyze(loader: &ImageLoader<'_>, config: &AnalysisConfig, url: &str) -> ImageAnalysisResult {
    let fetched = match loader.fetch(url, LoadOptions::default()) {
        Ok(fetched) => fetched,
        Err(err) => {
            let fallback = match err.cause {
                LoadFailure::Proxy(_) => AnalysisFallback::ProxyUnavailable,
                _ => AnalysisFallback::SourceUnreadable,
            };
            warn!(url, error = %err, ?fallback, "analysis fallback");
            return fallback.result(config);
        }
    };

    let backend = loader.backend();
    let dims = match backend.identify(&fetched.bytes) {
        Ok(dims) => dims,
        Err(err) => {
            warn!(url, resolved = %fetched.resolved_url, error = %err, "could not identify image");
            return AnalysisFallback::SourceUnreadable.result(config);
        }
    };
    if dims.is_empty() {
        warn!(url, "image has zero dimensions");
        return AnalysisFallback::EmptyBitmap(dims).result(config);
    }

    let bitmap = match backend.decode(&fetched.bytes) {
        Ok(bitmap) => bitmap,
        Err(err @ BackendError::DecodeFailed(_)) => {
            warn!(url, error = %err, "image body is unreadable");
            return AnalysisFallback::SourceUnreadable.result(config);
        }
        Err(err) => {
            warn!(url, error = %err, "pixel sampling unavailable, flagging strips");
            return AnalysisFallback::PixelSamplingUnavailable(dims).result(config);
        }
    };

    let strips = scan_strips(&bitmap, config);
    let low_res = low_resolution(dims, config);
    debug!(
        url,
        width = dims.width,
        height = dims.height,
        top = strips.top_rows,
        bottom = strips.bottom_rows,
        "analyzed"
    );
    if strips.significant {
        info!(url, top = strips.top_rows, bottom = strips.bottom_rows, "strip artifacts detected");
    }
    if low_res {
        info!(url, width = dims.width, height = dims.height, "potentially low resolution");
    }

    ImageAnalysisResult {
        has_significant_strips: Some(strips.significant),
        is_potentially_low_resolution: Some(low_res),
        natural_width: Some(dims.width),
        natural_height: Some(dims.height),
    }
}

/// Analyze many images in parallel. Results come back in input order.
pub fn analyze_all(
    loader: &ImageLoader<'_>,
    config: &AnalysisConfig,
    urls: &[String],
) -> Vec<(String, ImageAnalysisResult)> {
    urls.par_iter()
        .map(|url| (url.clone(), analyze(loader, config, url)))
        .collect()
}
