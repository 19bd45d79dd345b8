//! Image primitives: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify / decode** | `image::ImageReader` behind [`ImageBackend`] |
//! | **Crop + scale** | `imageops::crop_imm` + `imageops::resize` (Lanczos3) |
//! | **Overlay** | `imageops::overlay` (alpha blend) |
//! | **Caption text** | `font8x8` bitmap glyphs |
//! | **Encode** | PNG via `image::codecs::png` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry and thresholds (unit testable)
//! - **Parameters**: Sharpness and target size
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Text**: placeholder caption drawing

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;
pub mod text;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    CropPlacement, PixelRect, auto_adjust_crop, clamp_crop, default_crop, display_name,
    is_low_resolution, place_crop, sample_columns, scan_row_count,
};
pub use params::{Sharpness, TargetSize};
pub use rust_backend::{RustBackend, encode_png};
