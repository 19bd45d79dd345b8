//! Shared data model used across the analysis and compositing pipeline.
//!
//! These types cross the boundary to the (out-of-crate) gallery and preview
//! UIs as JSON, so field names serialize in camelCase. A source photograph is
//! identified by its URL string throughout; every map in this module is keyed
//! by that string.

use crate::imaging::Sharpness;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A crop rectangle in source-image pixel coordinates.
///
/// Coordinates are fractional: the auto-adjust routine and the interactive
/// crop editor both produce non-integral rectangles. `width == height` is the
/// operating assumption for square output but is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pan offset reported by the crop editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Per-image edit state owned by the caller's edit session.
///
/// `cropped_area_pixels == None` means no crop has been confirmed yet and the
/// compositor falls back to a centered square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEditState {
    #[serde(default)]
    pub crop: Point,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub cropped_area_pixels: Option<CropArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<Sharpness>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_adjusted: bool,
}

fn default_zoom() -> f64 {
    1.0
}

impl ImageEditState {
    /// A manually confirmed crop. A zero sharpness is not stored.
    pub fn manual(crop: Point, zoom: f64, area: CropArea, sharpness: Option<Sharpness>) -> Self {
        Self {
            crop,
            zoom,
            cropped_area_pixels: Some(area),
            sharpness: sharpness.filter(|s| s.is_active()),
            auto_adjusted: false,
        }
    }

    /// Whether a crop has been confirmed (manually or by auto-adjust).
    pub fn has_confirmed_crop(&self) -> bool {
        self.cropped_area_pixels.is_some()
    }
}

/// Pre-flight verdict for one source image.
///
/// `None` fields mean "not analysed or indeterminate", which is distinct from
/// `Some(false)` ("checked, not flagged"). Callers must not conflate the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_significant_strips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_potentially_low_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_height: Option<u32>,
}

impl ImageAnalysisResult {
    /// Every field unset: the image could not be inspected.
    pub fn indeterminate() -> Self {
        Self::default()
    }

    pub fn is_indeterminate(&self) -> bool {
        *self == Self::default()
    }

    /// Natural dimensions, when both are known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.natural_width?, self.natural_height?))
    }

    /// Clear both warning flags once the user (or auto-adjust) has handled
    /// the image. Dimensions are retained.
    pub fn mark_handled(&mut self) {
        self.has_significant_strips = Some(false);
        self.is_potentially_low_resolution = Some(false);
    }
}

/// An agent whose overlay card is composited onto the first image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    /// URL of a full-canvas transparent overlay image.
    pub overlay_image: String,
}

/// A team whose logo overlay is composited onto the first image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    /// URL of a full-canvas transparent overlay logo.
    pub overlay_logo: String,
}

/// At most one branding overlay per package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BrandingOverlay {
    Agent(Agent),
    Team(Team),
}

impl BrandingOverlay {
    /// Pick the overlay from an agent/team selection. Agent wins when both
    /// are present.
    pub fn choose(agent: Option<Agent>, team: Option<Team>) -> Option<Self> {
        agent.map(Self::Agent).or_else(|| team.map(Self::Team))
    }

    pub fn overlay_url(&self) -> &str {
        match self {
            Self::Agent(agent) => &agent.overlay_image,
            Self::Team(team) => &team.overlay_logo,
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Agent(_) => "agent",
            Self::Team(_) => "team",
        }
    }
}

/// Outcome of one package generation.
///
/// `successful_images` always has one PNG data URL per requested image, in
/// request order. Failed sources are represented by an error placeholder, and
/// their URLs are also listed in `failed_image_original_urls`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResult {
    pub successful_images: Vec<String>,
    pub failed_image_original_urls: Vec<String>,
    pub image_analysis: BTreeMap<String, ImageAnalysisResult>,
}

impl PackageResult {
    pub fn has_failures(&self) -> bool {
        !self.failed_image_original_urls.is_empty()
    }
}
