//! Caller-side edit session.
//!
//! Holds the state a gallery UI keeps between analysis and generation: which
//! photos are selected (in order), each photo's edit state, and each photo's
//! analysis verdict. The CLI drives the same flow.
//!
//! Analysis fields only ever narrow. Once a photo has been cropped, manually
//! or by auto-adjust, both warning flags are forced to `false` and its
//! dimensions kept. Only [`EditSession::reset`] (a fresh search) widens them
//! again.

use crate::compose::{AutoAdjustError, auto_adjust};
use crate::imaging::TargetSize;
use crate::package::PackageRequest;
use crate::types::{Agent, BrandingOverlay, ImageAnalysisResult, ImageEditState, Team};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Extensions a gallery URL must end with to count as a photo.
const PHOTO_EXTENSIONS: [&str; 5] = [".jpeg", ".jpg", ".gif", ".png", ".webp"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Please select at least one image.")]
    NoImages,
    #[error("Branding is required. Please select an Agent or a Team.")]
    NoBranding,
}

/// Pre-edit warning for a gallery tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageWarning {
    None,
    Shape,
    LowResolution,
    ShapeAndLowResolution,
}

impl ImageWarning {
    pub fn from_analysis(analysis: &ImageAnalysisResult) -> Self {
        match (
            analysis.has_significant_strips == Some(true),
            analysis.is_potentially_low_resolution == Some(true),
        ) {
            (true, true) => Self::ShapeAndLowResolution,
            (true, false) => Self::Shape,
            (false, true) => Self::LowResolution,
            (false, false) => Self::None,
        }
    }

    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Shape => Some("Adjust Shape"),
            Self::LowResolution => Some("Low Res?"),
            Self::ShapeAndLowResolution => Some("Shape & Low Res?"),
        }
    }

    /// Whether the editor can fix this automatically. Low resolution alone
    /// needs a human to judge.
    pub fn suggests_auto_adjust(self) -> bool {
        matches!(self, Self::Shape | Self::ShapeAndLowResolution)
    }
}

/// Tile status: an edit outranks any warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    AutoAdjusted,
    Edited,
    Warning(ImageWarning),
}

#[derive(Debug, Clone)]
pub struct EditSession {
    selection: Vec<String>,
    edit_states: BTreeMap<String, ImageEditState>,
    analyses: BTreeMap<String, ImageAnalysisResult>,
    max_selections: usize,
}

impl EditSession {
    pub fn new(max_selections: usize) -> Self {
        Self {
            selection: Vec::new(),
            edit_states: BTreeMap::new(),
            analyses: BTreeMap::new(),
            max_selections,
        }
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn edit_state(&self, url: &str) -> Option<&ImageEditState> {
        self.edit_states.get(url)
    }

    pub fn analysis(&self, url: &str) -> Option<&ImageAnalysisResult> {
        self.analyses.get(url)
    }

    /// Select or deselect `url`. Returns whether it is selected afterwards;
    /// selecting past the limit is a no-op.
    pub fn toggle_selection(&mut self, url: &str) -> bool {
        if let Some(pos) = self.selection.iter().position(|u| u == url) {
            self.selection.remove(pos);
            return false;
        }
        if self.selection.len() >= self.max_selections {
            debug!(url, limit = self.max_selections, "selection limit reached");
            return false;
        }
        self.selection.push(url.to_string());
        true
    }

    /// Record an analysis verdict. Known fields are never cleared by a
    /// later, less complete verdict. Once a confirmed crop exists the flags
    /// stay cleared and only dimensions are taken from `result`.
    pub fn record_analysis(&mut self, url: &str, result: ImageAnalysisResult) {
        let handled = self.edit_states.get(url).is_some_and(|e| e.has_confirmed_crop());
        let entry = self.analyses.entry(url.to_string()).or_default();
        if handled {
            entry.has_significant_strips = Some(false);
            entry.is_potentially_low_resolution = Some(false);
        } else {
            entry.has_significant_strips =
                result.has_significant_strips.or(entry.has_significant_strips);
            entry.is_potentially_low_resolution = result
                .is_potentially_low_resolution
                .or(entry.is_potentially_low_resolution);
        }
        entry.natural_width = result.natural_width.or(entry.natural_width);
        entry.natural_height = result.natural_height.or(entry.natural_height);
    }

    /// Store an edit and clear the photo's warning flags.
    pub fn save_crop(&mut self, url: &str, state: ImageEditState) {
        self.edit_states.insert(url.to_string(), state);
        self.analyses.entry(url.to_string()).or_default().mark_handled();
    }

    /// Apply the non-interactive crop. Fails closed when dimensions are
    /// unknown; the caller should fall back to the manual editor.
    pub fn auto_adjust(&mut self, url: &str, zoom: f64) -> Result<&ImageEditState, AutoAdjustError> {
        let state = auto_adjust(self.analyses.get(url), zoom).inspect_err(|err| {
            warn!(url, error = %err, "auto-adjust unavailable");
        })?;
        self.save_crop(url, state);
        self.edit_states
            .get(url)
            .ok_or(AutoAdjustError::DimensionsUnknown)
    }

    pub fn warning(&self, url: &str) -> ImageWarning {
        if self.edit_states.get(url).is_some_and(|e| e.has_confirmed_crop()) {
            return ImageWarning::None;
        }
        self.analyses
            .get(url)
            .map_or(ImageWarning::None, ImageWarning::from_analysis)
    }

    pub fn status(&self, url: &str) -> ImageStatus {
        match self.edit_states.get(url) {
            Some(e) if e.auto_adjusted => ImageStatus::AutoAdjusted,
            Some(e) if e.has_confirmed_crop() => ImageStatus::Edited,
            _ => ImageStatus::Warning(self.warning(url)),
        }
    }

    /// Start over for a new search.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.edit_states.clear();
        self.analyses.clear();
    }

    /// Validate the selection and assemble a generation request.
    ///
    /// Branding is mandatory; an agent takes precedence over a team.
    pub fn build_request(
        &self,
        agent: Option<Agent>,
        team: Option<Team>,
        target: TargetSize,
    ) -> Result<PackageRequest, SelectionError> {
        if self.selection.is_empty() {
            return Err(SelectionError::NoImages);
        }
        let overlay = BrandingOverlay::choose(agent, team).ok_or(SelectionError::NoBranding)?;
        let edit_states = self
            .selection
            .iter()
            .filter_map(|url| Some((url.clone(), self.edit_states.get(url)?.clone())))
            .collect();
        Ok(PackageRequest {
            ordered_urls: self.selection.clone(),
            edit_states,
            overlay: Some(overlay),
            target,
        })
    }
}

/// Split a space-separated listing gallery into photo URLs.
pub fn filter_photo_urls(gallery: &str) -> Vec<String> {
    gallery
        .split(' ')
        .map(str::trim)
        .filter(|url| {
            let lower = url.to_ascii_lowercase();
            !url.is_empty() && PHOTO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .map(str::to_string)
        .collect()
}
