//! Shared test utilities for the listing-pack test suite.
//!
//! In-memory stand-ins for the network collaborators of
//! [`ImageLoader`](crate::loader::ImageLoader), plus bitmap builders for
//! synthetic listing photos.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fetcher = MemoryFetcher::new().with("https://a.test/1.png", png_bytes(40, 30));
//! let resolver = FixedResolver::new("https://ucarecdn.com/feed/");
//! let backend = RustBackend::new();
//! let proxy = ProxyConfig::default();
//! let loader = ImageLoader::new(&fetcher, &resolver, &backend, &proxy);
//! ```

use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::imaging::encode_png;
use crate::loader::{FetchError, Fetcher};
use crate::proxy::{ProxyError, ProxyResolver, canonical_base};

// =========================================================================
// Bitmap builders
// =========================================================================

pub const DARK: Rgba<u8> = Rgba([40, 40, 40, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Solid-color bitmap.
pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// Dark photo with white letterbox bands of `band_rows` at top and bottom.
pub fn letterboxed(width: u32, height: u32, band_rows: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| {
        if y < band_rows || y >= height.saturating_sub(band_rows) {
            WHITE
        } else {
            DARK
        }
    })
}

pub fn encode(img: &RgbaImage) -> Vec<u8> {
    encode_png(img).unwrap()
}

/// PNG bytes of a dark solid image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&solid(width, height, DARK))
}

// =========================================================================
// Fetcher
// =========================================================================

/// Serves canned bytes by exact URL; unknown URLs answer 404.
/// Records every requested URL in order.
#[derive(Default)]
pub struct MemoryFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), bytes);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// =========================================================================
// Resolvers
// =========================================================================

/// Resolves every URL to the same canonical base and records the calls.
pub struct FixedResolver {
    base: String,
    calls: Mutex<Vec<String>>,
}

impl FixedResolver {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProxyResolver for FixedResolver {
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError> {
        self.calls.lock().unwrap().push(original_url.to_string());
        Ok(self.base.clone())
    }
}

/// Rejects every URL.
pub struct FailingResolver;

impl ProxyResolver for FailingResolver {
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError> {
        Err(ProxyError::Rejected {
            url: original_url.to_string(),
            reason: "mirror refused the source".into(),
        })
    }
}

/// Content-addressed mirror: the canonical id is derived from a SHA-256 of
/// the source bytes, so identical content always lands on the same URL.
pub struct ContentMirror {
    cdn_base: String,
    sources: HashMap<String, Vec<u8>>,
}

impl ContentMirror {
    pub fn new(cdn_base: &str) -> Self {
        Self {
            cdn_base: cdn_base.to_string(),
            sources: HashMap::new(),
        }
    }

    pub fn with_source(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.sources.insert(url.to_string(), bytes);
        self
    }

    pub fn canonical_url_for(&self, bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        let id: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        canonical_base(&self.cdn_base, &id)
    }

    /// `(canonical_url, bytes)` for every source, for seeding a fetcher.
    pub fn mirrored(&self) -> Vec<(String, Vec<u8>)> {
        self.sources
            .values()
            .map(|bytes| (self.canonical_url_for(bytes), bytes.clone()))
            .collect()
    }
}

impl ProxyResolver for ContentMirror {
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError> {
        self.sources
            .get(original_url)
            .map(|bytes| self.canonical_url_for(bytes))
            .ok_or_else(|| ProxyError::Request {
                url: original_url.to_string(),
                reason: "source unreachable".into(),
            })
    }
}
