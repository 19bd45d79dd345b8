//! End-to-end package generation against in-memory collaborators.
//!
//! Drives the public API the way the CLI does: analyze, auto-adjust through
//! an edit session, build a request, generate, and decode every PNG.
//!
//! Run with: cargo test --test package_pipeline

use image::{ImageEncoder, Rgba, RgbaImage};
use listing_pack::analyze::analyze_all;
use listing_pack::compose::png_from_data_url;
use listing_pack::config::PackageConfig;
use listing_pack::imaging::{ImageBackend, RustBackend, TargetSize, encode_png};
use listing_pack::loader::{FetchError, Fetcher, ImageLoader};
use listing_pack::package::{PackageRequest, generate_package};
use listing_pack::proxy::{ProxyError, ProxyResolver};
use listing_pack::session::{EditSession, ImageStatus};
use listing_pack::types::{Agent, BrandingOverlay};
use std::collections::HashMap;

const AGENT_CARD: &str = "https://cdn.example.com/agents/dana-card.png";
const CLOSING: &str = "https://cdn.example.com/closing.png";

const BODY: Rgba<u8> = Rgba([60, 90, 120, 255]);
const AGENT_MARK: Rgba<u8> = Rgba([250, 200, 0, 255]);
const CLOSING_MARK: Rgba<u8> = Rgba([0, 160, 80, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

struct StaticFetcher(HashMap<String, Vec<u8>>);

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.0.get(url).cloned().ok_or_else(|| FetchError::Request {
            url: url.to_string(),
            reason: "connection refused".into(),
        })
    }
}

struct NoMirror;

impl ProxyResolver for NoMirror {
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError> {
        Err(ProxyError::Rejected {
            url: original_url.to_string(),
            reason: "mirror disabled in tests".into(),
        })
    }
}

fn png(img: &RgbaImage) -> Vec<u8> {
    encode_png(img).unwrap()
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([60, 90, 120]));
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 100)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Transparent overlay with a solid block in one corner.
fn corner_overlay(color: Rgba<u8>, top_left: bool) -> Vec<u8> {
    png(&RgbaImage::from_fn(64, 64, |x, y| {
        let in_block = if top_left {
            x < 16 && y < 16
        } else {
            x >= 48 && y >= 48
        };
        if in_block { color } else { CLEAR }
    }))
}

fn listing_urls() -> Vec<String> {
    ["front.png", "kitchen.png", "yard.png"]
        .iter()
        .map(|name| format!("https://photos.example.com/listing/{name}"))
        .collect()
}

fn fetcher(urls: &[String]) -> StaticFetcher {
    let mut map = HashMap::new();
    for url in urls {
        map.insert(url.clone(), png(&RgbaImage::from_pixel(96, 64, BODY)));
    }
    map.insert(AGENT_CARD.to_string(), corner_overlay(AGENT_MARK, true));
    map.insert(CLOSING.to_string(), corner_overlay(CLOSING_MARK, false));
    StaticFetcher(map)
}

fn config() -> PackageConfig {
    let mut config = PackageConfig::default();
    config.composition.closing_overlay_url = CLOSING.to_string();
    config
}

fn decode(data_url: &str) -> RgbaImage {
    let bytes = png_from_data_url(data_url).expect("PNG data URL");
    RustBackend::new().decode(&bytes).unwrap()
}

fn agent() -> Agent {
    Agent {
        id: "agent-7".into(),
        name: "Dana".into(),
        overlay_image: AGENT_CARD.into(),
    }
}

// =========================================================================
// Overlay placement
// =========================================================================

#[test]
fn three_images_with_agent_overlay() {
    let urls = listing_urls();
    let fetcher = fetcher(&urls);
    let backend = RustBackend::new();
    let config = config();
    let loader = ImageLoader::new(&fetcher, &NoMirror, &backend, &config.proxy);

    let request = PackageRequest {
        ordered_urls: urls.clone(),
        overlay: Some(BrandingOverlay::Agent(agent())),
        target: TargetSize::square(64),
        ..Default::default()
    };
    let result = generate_package(&loader, &config, &request, None);

    assert_eq!(result.successful_images.len(), 3);
    assert!(result.failed_image_original_urls.is_empty());

    let first = decode(&result.successful_images[0]);
    let middle = decode(&result.successful_images[1]);
    let last = decode(&result.successful_images[2]);

    assert_eq!(first.dimensions(), (64, 64));
    assert_eq!(*first.get_pixel(4, 4), AGENT_MARK);
    assert_eq!(*first.get_pixel(60, 60), BODY);

    assert_eq!(*middle.get_pixel(4, 4), BODY);
    assert_eq!(*middle.get_pixel(60, 60), BODY);

    assert_eq!(*last.get_pixel(4, 4), BODY);
    assert_eq!(*last.get_pixel(60, 60), CLOSING_MARK);
}

// =========================================================================
// Failure isolation
// =========================================================================

#[test]
fn unreachable_image_fails_alone() {
    let mut urls = listing_urls();
    let fetcher = fetcher(&urls);
    urls.insert(1, "https://offline.example.com/listing/garage.png".to_string());
    let backend = RustBackend::new();
    let config = config();
    let loader = ImageLoader::new(&fetcher, &NoMirror, &backend, &config.proxy);

    let request = PackageRequest {
        ordered_urls: urls.clone(),
        overlay: Some(BrandingOverlay::Agent(agent())),
        target: TargetSize::square(64),
        ..Default::default()
    };
    let result = generate_package(&loader, &config, &request, None);

    assert_eq!(result.successful_images.len(), urls.len());
    assert_eq!(result.failed_image_original_urls, vec![urls[1].clone()]);
    assert!(result.image_analysis[&urls[1]].is_indeterminate());

    // Every entry, placeholder included, is a decodable PNG of the target size.
    for data_url in &result.successful_images {
        assert_eq!(decode(data_url).dimensions(), (64, 64));
    }
    assert_eq!(*decode(&result.successful_images[0]).get_pixel(4, 4), AGENT_MARK);
    assert_eq!(*decode(&result.successful_images[2]).get_pixel(4, 4), BODY);
}

#[test]
fn proxied_host_without_mirror_becomes_placeholder() {
    let urls = vec!["https://ddfcdn.realtor.ca/listing/TS1/1.jpg".to_string()];
    let fetcher = StaticFetcher(HashMap::from([(urls[0].clone(), jpeg(50, 50))]));
    let backend = RustBackend::new();
    let config = config();
    let loader = ImageLoader::new(&fetcher, &NoMirror, &backend, &config.proxy);

    let request = PackageRequest {
        ordered_urls: urls.clone(),
        target: TargetSize::square(32),
        ..Default::default()
    };
    let result = generate_package(&loader, &config, &request, None);
    assert_eq!(result.failed_image_original_urls, urls);
}

// =========================================================================
// Analyze → edit → package
// =========================================================================

#[test]
fn letterboxed_photo_is_auto_adjusted_before_packaging() {
    let urls = listing_urls();
    let mut fetcher = fetcher(&urls);
    // White bands covering 15% top and bottom.
    let letterboxed = RgbaImage::from_fn(200, 200, |_, y| {
        if !(30..170).contains(&y) {
            Rgba([255, 255, 255, 255])
        } else {
            BODY
        }
    });
    fetcher.0.insert(urls[0].clone(), png(&letterboxed));

    let backend = RustBackend::new();
    let config = config();
    let loader = ImageLoader::new(&fetcher, &NoMirror, &backend, &config.proxy);

    let mut session = EditSession::new(config.composition.max_selections);
    for (url, verdict) in analyze_all(&loader, &config.analysis, &urls) {
        session.record_analysis(&url, verdict);
        session.toggle_selection(&url);
    }
    assert!(session.warning(&urls[0]).suggests_auto_adjust());
    session
        .auto_adjust(&urls[0], config.composition.auto_adjust_zoom)
        .unwrap();
    assert_eq!(session.status(&urls[0]), ImageStatus::AutoAdjusted);
    assert_eq!(
        session.analysis(&urls[0]).unwrap().has_significant_strips,
        Some(false)
    );

    let request = session
        .build_request(Some(agent()), None, TargetSize::square(64))
        .unwrap();
    let result = generate_package(&loader, &config, &request, None);
    assert!(result.failed_image_original_urls.is_empty());
    assert_eq!(
        result.image_analysis[&urls[0]].has_significant_strips,
        Some(false)
    );
    assert_eq!(result.image_analysis[&urls[1]].has_significant_strips, None);
}
