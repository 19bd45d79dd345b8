//! Package orchestration.
//!
//! Runs the composition engine over the selected photos in order and collects
//! one [`PackageResult`]. Position decides overlays: the branding overlay goes
//! on the first image, the fixed closing overlay on the last (a single-image
//! package gets both).
//!
//! Images are composed one at a time. Only one canvas is alive at a
//! time and output order follows input order without reassembly.
//!
//! Generation never fails as a whole. A source that cannot be rendered is
//! replaced by a placeholder at the same index and listed in
//! `failed_image_original_urls`, so `successful_images[i]` always corresponds
//! to `ordered_urls[i]`.

use crate::compose::{Composition, Overlays, compose};
use crate::config::PackageConfig;
use crate::imaging::TargetSize;
use crate::loader::ImageLoader;
use crate::types::{BrandingOverlay, ImageAnalysisResult, ImageEditState, PackageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use tracing::{info, warn};

/// Everything one generation run needs from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
    pub ordered_urls: Vec<String>,
    #[serde(default)]
    pub edit_states: BTreeMap<String, ImageEditState>,
    #[serde(default)]
    pub overlay: Option<BrandingOverlay>,
    #[serde(default)]
    pub target: TargetSize,
}

/// Progress events emitted while a package is generated.
#[derive(Debug, Clone)]
pub enum PackageEvent {
    Started {
        total: usize,
    },
    ImageComposed {
        index: usize,
        total: usize,
        url: String,
        source_failed: bool,
        skipped_overlays: Vec<String>,
    },
}

/// Generate the package. See the module docs for the guarantees.
pub fn generate_package(
    loader: &ImageLoader<'_>,
    config: &PackageConfig,
    request: &PackageRequest,
    progress: Option<Sender<PackageEvent>>,
) -> PackageResult {
    let total = request.ordered_urls.len();
    let mut result = PackageResult::default();
    if let Some(tx) = &progress {
        tx.send(PackageEvent::Started { total }).ok();
    }
    info!(total, target = ?request.target, "generating package");

    for (index, url) in request.ordered_urls.iter().enumerate() {
        let edit = request.edit_states.get(url);
        let overlays = Overlays {
            branding: if index == 0 { request.overlay.as_ref() } else { None },
            closing: (index + 1 == total).then_some(config.composition.closing_overlay_url.as_str()),
        };

        let Composition {
            data_url,
            source_failed,
            overlay_failures,
            ..
        } = compose(loader, &config.composition, url, edit, overlays, request.target);

        result.successful_images.push(data_url);
        let analysis = if source_failed {
            warn!(index, url = url.as_str(), "source failed, placeholder used");
            result.failed_image_original_urls.push(url.clone());
            ImageAnalysisResult::indeterminate()
        } else {
            post_generation_analysis(edit)
        };
        result.image_analysis.insert(url.clone(), analysis);

        if let Some(tx) = &progress {
            tx.send(PackageEvent::ImageComposed {
                index,
                total,
                url: url.clone(),
                source_failed,
                skipped_overlays: overlay_failures,
            })
            .ok();
        }
    }

    info!(
        total,
        failed = result.failed_image_original_urls.len(),
        "package generated"
    );
    result
}

/// A confirmed crop is taken to have handled any strips. Resolution is not
/// re-checked here.
fn post_generation_analysis(edit: Option<&ImageEditState>) -> ImageAnalysisResult {
    ImageAnalysisResult {
        has_significant_strips: edit.filter(|e| e.has_confirmed_crop()).map(|_| false),
        ..ImageAnalysisResult::indeterminate()
    }
}
