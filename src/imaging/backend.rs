//! Bitmap decoding capability trait and shared types.
//!
//! The [`ImageBackend`] trait is the narrow pixel-access seam the analyzer and
//! compositor are written against: identify dimensions from encoded bytes, and
//! decode to an RGBA bitmap whose pixels can be read back.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests substitute a recording mock.

use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Image exceeds decode limits ({width}x{height})")]
    TooLarge { width: u32, height: u32 },
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Trait for bitmap decoding backends.
///
/// `identify` must be cheap (header only) so the analyzer can record natural
/// dimensions even when a full pixel decode later fails.
pub trait ImageBackend: Sync {
    /// Read image dimensions from encoded bytes.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode encoded bytes into a readable RGBA bitmap.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;
}
