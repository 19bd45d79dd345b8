//! Remote image loading.
//!
//! [`ImageLoader`] is the explicit context every pipeline stage receives. It
//! bundles the three collaborators a load needs (the byte [`Fetcher`], the
//! [`ProxyResolver`] and the decoding [`ImageBackend`]) together with the
//! proxy settings, so nothing in the pipeline reaches for ambient state and
//! tests can swap any piece for an in-memory double.
//!
//! A load runs in three steps:
//!
//! 1. **Resolve**: decide the URL to actually fetch. URLs already on the
//!    canonical CDN are rebased onto their storage id without a round-trip;
//!    problematic hosts and sharpening requests go through the resolver.
//! 2. **Fetch**: download the bytes.
//! 3. **Decode**: hand the bytes to the backend.
//!
//! Any failure surfaces as an [`ImageLoadError`] naming both the original and
//! the resolved URL. There is no retry here; callers decide what a failure
//! means.

use crate::config::{NetworkConfig, PackageConfig, ProxyConfig};
use crate::imaging::{BackendError, ImageBackend, RustBackend, Sharpness};
use crate::proxy::{
    ProxyError, ProxyResolver, UploadcareResolver, canonical_base, canonical_id,
    is_problematic_host, with_sharpen,
};
use image::RgbaImage;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL {url}")]
    InvalidUrl { url: String },
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Why a load failed.
#[derive(Error, Debug)]
pub enum LoadFailure {
    #[error("proxy resolution failed: {0}")]
    Proxy(#[from] ProxyError),
    #[error("network failure: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failure: {0}")]
    Decode(#[from] BackendError),
}

#[derive(Error, Debug)]
#[error("Image load failed for {resolved_url} (original: {original_url}): {cause}")]
pub struct ImageLoadError {
    pub original_url: String,
    pub resolved_url: String,
    #[source]
    pub cause: LoadFailure,
}

impl ImageLoadError {
    fn new(original_url: &str, resolved_url: &str, cause: impl Into<LoadFailure>) -> Self {
        Self {
            original_url: original_url.to_string(),
            resolved_url: resolved_url.to_string(),
            cause: cause.into(),
        }
    }
}

/// Downloads raw bytes for a URL.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Build the shared blocking HTTP client.
///
/// The client holds no cookie store and sends no credentials, so every
/// request is the equivalent of an anonymous cross-origin load.
pub fn http_client(network: &NetworkConfig) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(network.user_agent.clone())
        .timeout(network.timeout())
        .build()
}

/// [`Fetcher`] over a reqwest blocking client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }
        let response = self.client.get(url).send().map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Per-load options.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub sharpness: Option<Sharpness>,
}

impl LoadOptions {
    pub fn sharpened(sharpness: Option<Sharpness>) -> Self {
        Self { sharpness }
    }

    fn active_sharpness(&self) -> Option<Sharpness> {
        self.sharpness.filter(|s| s.is_active())
    }
}

/// Encoded bytes fetched for an image, before decoding.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub original_url: String,
    pub resolved_url: String,
    pub bytes: Vec<u8>,
}

/// A decoded image along with the URL it was actually fetched from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub resolved_url: String,
    pub bitmap: RgbaImage,
}

/// Explicit loading context shared by the analyzer, compositor and orchestrator.
#[derive(Clone, Copy)]
pub struct ImageLoader<'a> {
    fetcher: &'a dyn Fetcher,
    resolver: &'a dyn ProxyResolver,
    backend: &'a dyn ImageBackend,
    proxy: &'a ProxyConfig,
}

impl<'a> ImageLoader<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        resolver: &'a dyn ProxyResolver,
        backend: &'a dyn ImageBackend,
        proxy: &'a ProxyConfig,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            backend,
            proxy,
        }
    }

    pub fn backend(&self) -> &'a dyn ImageBackend {
        self.backend
    }

    /// Decide which URL to fetch for `original_url`.
    pub fn resolve_url(&self, original_url: &str, options: LoadOptions) -> Result<String, ProxyError> {
        let sharpness = options.active_sharpness();
        let base = match canonical_id(original_url, &self.proxy.canonical_host) {
            Some(id) => Some(canonical_base(&self.proxy.cdn_base, &id)),
            None if sharpness.is_some()
                || is_problematic_host(original_url, &self.proxy.problematic_hosts) =>
            {
                Some(self.resolver.resolve(original_url)?)
            }
            None => None,
        };
        Ok(match (base, sharpness) {
            (Some(base), Some(s)) => with_sharpen(&base, s),
            (Some(base), None) => base,
            (None, _) => original_url.to_string(),
        })
    }

    /// Resolve and download, without decoding.
    pub fn fetch(&self, original_url: &str, options: LoadOptions) -> Result<FetchedImage, ImageLoadError> {
        let resolved_url = self
            .resolve_url(original_url, options)
            .map_err(|e| ImageLoadError::new(original_url, original_url, e))?;
        if resolved_url != original_url {
            debug!(original = original_url, resolved = %resolved_url, "loading via CDN");
        }
        let bytes = self
            .fetcher
            .fetch(&resolved_url)
            .map_err(|e| ImageLoadError::new(original_url, &resolved_url, e))?;
        Ok(FetchedImage {
            original_url: original_url.to_string(),
            resolved_url,
            bytes,
        })
    }

    /// Resolve, download and decode.
    pub fn load(&self, original_url: &str, options: LoadOptions) -> Result<LoadedImage, ImageLoadError> {
        let fetched = self.fetch(original_url, options)?;
        let bitmap = self
            .backend
            .decode(&fetched.bytes)
            .map_err(|e| ImageLoadError::new(original_url, &fetched.resolved_url, e))?;
        Ok(LoadedImage {
            resolved_url: fetched.resolved_url,
            bitmap,
        })
    }
}

/// Owned production collaborators, for callers that just want a working
/// [`ImageLoader`] from a config.
pub struct HttpServices {
    fetcher: HttpFetcher,
    resolver: UploadcareResolver,
    backend: RustBackend,
}

impl HttpServices {
    pub fn new(config: &PackageConfig) -> reqwest::Result<Self> {
        let client = http_client(&config.network)?;
        Ok(Self {
            fetcher: HttpFetcher::new(client.clone()),
            resolver: UploadcareResolver::new(client, &config.proxy),
            backend: RustBackend::new().with_max_decoded_pixels(config.network.max_decoded_pixels),
        })
    }

    pub fn loader<'a>(&'a self, config: &'a PackageConfig) -> ImageLoader<'a> {
        ImageLoader::new(&self.fetcher, &self.resolver, &self.backend, &config.proxy)
    }
}
