//! Parameter types for image operations.
//!
//! - [`Sharpness`]: server-side sharpening strength (0–20). Clamped on construction.
//! - [`TargetSize`]: output canvas dimensions (1080×1080 in production).

use serde::{Deserialize, Serialize};

/// Sharpening strength requested from the CDN transform (0–20).
///
/// Zero means "no sharpening": it never triggers proxying and never adds a
/// transform segment to the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Sharpness(u8);

impl Sharpness {
    pub const MAX: u8 = 20;

    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether a sharpening transform should be applied at all.
    pub fn is_active(self) -> bool {
        self.0 > 0
    }
}

impl From<u8> for Sharpness {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Sharpness> for u8 {
    fn from(value: Sharpness) -> Self {
        value.0
    }
}

/// Output canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::square(1080)
    }
}
