//! Pure Rust decoding backend on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `ImageReader::with_guessed_format` (magic bytes, not URL extension) |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP) | `ImageReader::decode` → `to_rgba8` |
//! | Encode PNG | `image::codecs::png::PngEncoder` |
//!
//! Decodes are bounded by a pixel budget so a hostile or corrupt listing
//! photo cannot allocate unbounded memory.

use super::backend::{BackendError, Dimensions, ImageBackend};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, ImageReader, RgbaImage};
use std::io::Cursor;

/// Default decode budget: 64 megapixels.
pub const DEFAULT_MAX_DECODED_PIXELS: u64 = 64_000_000;

/// Backend using the `image` crate's pure-Rust decoders.
pub struct RustBackend {
    max_decoded_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_decoded_pixels: DEFAULT_MAX_DECODED_PIXELS,
        }
    }

    pub fn with_max_decoded_pixels(mut self, max: u64) -> Self {
        self.max_decoded_pixels = max.max(1);
        self
    }

    fn reader<'a>(&self, bytes: &'a [u8]) -> Result<ImageReader<Cursor<&'a [u8]>>, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::DecodeFailed(e.to_string()))?;
        if reader.format().is_none() {
            return Err(BackendError::UnknownFormat);
        }
        Ok(reader)
    }

    fn check_budget(&self, width: u32, height: u32) -> Result<(), BackendError> {
        let pixels = (width as u64).saturating_mul(height as u64);
        if pixels > self.max_decoded_pixels {
            return Err(BackendError::TooLarge { width, height });
        }
        Ok(())
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_limits(max_pixels: u64) -> image::Limits {
    let max_dim = max_pixels.min(u32::MAX as u64) as u32;
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(max_dim);
    limits.max_image_height = Some(max_dim);
    limits.max_alloc = Some(max_pixels.saturating_mul(4));
    limits
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = self
            .reader(bytes)?
            .into_dimensions()
            .map_err(|e| BackendError::DecodeFailed(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        let dims = self.identify(bytes)?;
        self.check_budget(dims.width, dims.height)?;
        let mut reader = self.reader(bytes)?;
        reader.limits(decode_limits(self.max_decoded_pixels));
        let image = reader
            .decode()
            .map_err(|e| BackendError::DecodeFailed(e.to_string()))?;
        Ok(image.to_rgba8())
    }
}

/// Encode an RGBA bitmap as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
