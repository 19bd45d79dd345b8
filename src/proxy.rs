//! CDN proxy resolution.
//!
//! Some listing-photo hosts refuse cross-origin pixel access or serve byte
//! streams the decoders cannot inspect. Those images are mirrored through a
//! content-addressed CDN first; the mirror's canonical URL also accepts
//! URL-encoded transforms, which is how sharpening is applied server-side.
//!
//! URL shapes:
//!
//! ```text
//! https://ucarecdn.com/<uuid>/                  canonical base
//! https://ucarecdn.com/<uuid>/-/sharp/12/       canonical base + sharpen
//! ```
//!
//! [`UploadcareResolver`] speaks the mirror's upload API:
//!
//! 1. `POST {upload_base}/from_url/` with `pub_key`, `source_url`, `store=auto`.
//!    The response is either a job token or, for content the mirror already
//!    holds, the finished file info.
//! 2. `GET {upload_base}/from_url/status/?token=…` until the job reports
//!    `success` (uuid known), `error`, or the attempt budget runs out.
//!
//! Results are never cached here; each call is an independent round-trip.

use crate::config::ProxyConfig;
use crate::imaging::Sharpness;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("CDN mirror is not configured (missing public key)")]
    NotConfigured,
    #[error("Mirror request for {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("Mirror rejected {url}: {reason}")]
    Rejected { url: String, reason: String },
    #[error("Mirror did not finish {url} after {attempts} status checks")]
    Timeout { url: String, attempts: u32 },
}

/// Maps a source URL to the canonical base URL of its mirrored copy.
pub trait ProxyResolver: Sync {
    /// Mirror `original_url` and return its canonical base URL
    /// (ending in `/`, with no transforms applied).
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError>;
}

/// Extract the storage id from a URL that already points at the canonical CDN.
///
/// Returns `None` for any other host or for a first path segment that is not
/// a hex/dash identifier. A segment of dashes alone (the `-/` transform
/// prefix) is not an id.
pub fn canonical_id(url: &str, canonical_host: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !host.eq_ignore_ascii_case(canonical_host) {
        return None;
    }
    let first = parsed.path_segments()?.next()?;
    let is_id = first.chars().any(|c| c.is_ascii_hexdigit())
        && first.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    is_id.then(|| first.to_ascii_lowercase())
}

/// Canonical base URL for a storage id.
pub fn canonical_base(cdn_base: &str, id: &str) -> String {
    format!("{}/{}/", cdn_base.trim_end_matches('/'), id)
}

/// Whether `url` is served by a host that must be mirrored before loading.
///
/// Subdomains of a listed host match too.
pub fn is_problematic_host(url: &str, hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    hosts.iter().any(|listed| {
        let listed = listed.to_ascii_lowercase();
        host == listed || host.ends_with(&format!(".{listed}"))
    })
}

/// Append a sharpen transform to a canonical base URL.
///
/// Inactive sharpness leaves the URL untouched.
pub fn with_sharpen(base: &str, sharpness: Sharpness) -> String {
    if !sharpness.is_active() {
        return base.to_string();
    }
    let mut url = base.to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(&format!("-/sharp/{}/", sharpness.value()));
    url
}

// =============================================================================
// Mirror client
// =============================================================================

/// Resolver backed by the Uploadcare-style `from_url` upload API.
pub struct UploadcareResolver {
    client: Client,
    upload_base: String,
    cdn_base: String,
    public_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

/// Response to the initial `from_url` request.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "type")]
    kind: String,
    token: Option<String>,
    uuid: Option<String>,
}

/// Response to a status poll.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    uuid: Option<String>,
    error: Option<String>,
}

impl UploadcareResolver {
    pub fn new(client: Client, config: &ProxyConfig) -> Self {
        Self {
            client,
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            cdn_base: config.cdn_base.clone(),
            public_key: config.public_key.clone(),
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    fn submit(&self, original_url: &str) -> Result<UploadResponse, ProxyError> {
        let endpoint = format!("{}/from_url/", self.upload_base);
        self.client
            .post(&endpoint)
            .form(&[
                ("pub_key", self.public_key.as_str()),
                ("source_url", original_url),
                ("store", "auto"),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<UploadResponse>())
            .map_err(|e| request_error(original_url, e))
    }

    fn poll(&self, original_url: &str, token: &str) -> Result<String, ProxyError> {
        let endpoint = format!("{}/from_url/status/", self.upload_base);
        self.poll_until(original_url, || {
            self.client
                .get(&endpoint)
                .query(&[("token", token)])
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json::<StatusResponse>())
                .map_err(|e| request_error(original_url, e))
        })
    }

    /// Run `check` until the job settles or the attempt budget is spent.
    fn poll_until(
        &self,
        original_url: &str,
        mut check: impl FnMut() -> Result<StatusResponse, ProxyError>,
    ) -> Result<String, ProxyError> {
        for attempt in 1..=self.max_poll_attempts {
            let status = check()?;
            let pending = status.status.clone();
            if let Some(outcome) = interpret_status(original_url, status) {
                return outcome;
            }
            debug!(url = original_url, attempt, status = %pending, "mirror job pending");
            if attempt < self.max_poll_attempts {
                std::thread::sleep(self.poll_interval);
            }
        }
        Err(ProxyError::Timeout {
            url: original_url.to_string(),
            attempts: self.max_poll_attempts,
        })
    }
}

/// What the initial upload response asks for next.
#[derive(Debug, PartialEq)]
enum Upload {
    /// The file already exists on the CDN.
    Ready(String),
    /// Poll the status endpoint with this token.
    Pending(String),
}

fn interpret_upload(original_url: &str, upload: UploadResponse) -> Result<Upload, ProxyError> {
    match (upload.kind.as_str(), upload.uuid, upload.token) {
        ("file_info", Some(uuid), _) => Ok(Upload::Ready(uuid)),
        (_, _, Some(token)) => Ok(Upload::Pending(token)),
        (kind, _, None) => Err(ProxyError::Rejected {
            url: original_url.to_string(),
            reason: format!("unexpected upload response type '{kind}'"),
        }),
    }
}

/// Settled outcome of a status poll, or `None` while the job is still running.
fn interpret_status(original_url: &str, status: StatusResponse) -> Option<Result<String, ProxyError>> {
    match status.status.as_str() {
        "success" => Some(status.uuid.ok_or_else(|| ProxyError::Rejected {
            url: original_url.to_string(),
            reason: "success status without file id".into(),
        })),
        "error" => Some(Err(ProxyError::Rejected {
            url: original_url.to_string(),
            reason: status.error.unwrap_or_else(|| "unknown error".into()),
        })),
        _ => None,
    }
}

fn request_error(url: &str, err: reqwest::Error) -> ProxyError {
    ProxyError::Request {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

impl ProxyResolver for UploadcareResolver {
    fn resolve(&self, original_url: &str) -> Result<String, ProxyError> {
        if self.public_key.is_empty() {
            return Err(ProxyError::NotConfigured);
        }
        let uuid = match interpret_upload(original_url, self.submit(original_url)?)? {
            Upload::Ready(uuid) => uuid,
            Upload::Pending(token) => self.poll(original_url, &token)?,
        };
        let base = canonical_base(&self.cdn_base, &uuid);
        info!(url = original_url, canonical = %base, "mirrored via CDN");
        Ok(base)
    }
}
