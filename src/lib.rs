//! # Listing Pack
//!
//! Turns a set of externally hosted listing photographs into a fixed-size
//! (1080×1080 by default) branded image package ready for social posting.
//!
//! # Architecture: Analyze, Then Compose
//!
//! ```text
//! 1. Analyze   urls            →  ImageAnalysisResult per url   (strips, low-res, dimensions)
//! 2. Edit      caller session  →  ImageEditState per url        (manual crop or auto-adjust)
//! 3. Package   urls + edits    →  PackageResult                 (ordered PNG data URLs)
//! ```
//!
//! Both the analyzer and the compositor load images through the same
//! [`loader::ImageLoader`], an explicit context holding the byte fetcher, the
//! CDN proxy resolver and the decoding backend. Nothing in the pipeline uses
//! ambient network or credential state, so every stage runs against in-memory
//! doubles in tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`loader`] | Remote image loading: URL resolution, fetch, decode, `ImageLoadError` |
//! | [`proxy`] | CDN mirror: canonical ids, problematic hosts, sharpen transforms, mirror client |
//! | [`analyze`] | Pre-flight strip and low-resolution detection with named cautious fallbacks |
//! | [`compose`] | One photo → one square PNG data URL, overlays, error placeholder, auto-adjust |
//! | [`package`] | Ordered orchestration over the selection with position-aware overlays |
//! | [`session`] | Caller-side selection, edit and analysis state; request validation |
//! | [`config`] | `listing-pack.toml` loading, validation, and merging over stock defaults |
//! | [`types`] | Shared serde data model (`ImageEditState`, `ImageAnalysisResult`, `PackageResult`) |
//! | [`imaging`] | Pure-Rust decode/encode backend, crop geometry, bitmap captions |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Failures Become Data
//!
//! Analysis and composition never return errors. A photo that cannot be
//! analysed gets a verdict whose unknown fields stay `None` (or a cautious
//! `true` where the failure itself is suspicious). A photo that cannot be
//! rendered becomes a gray placeholder at the same index. One bad photo never
//! aborts a batch.
//!
//! ## Server-Side Sharpening
//!
//! Sharpening is a URL transform on the CDN mirror, not a local convolution.
//! Requesting it routes the photo through the mirror even when its host would
//! otherwise be loaded directly.
//!
//! ## Synchronous I/O
//!
//! Loads use a blocking HTTP client. Package generation is sequential; bulk
//! analysis fans out over a rayon pool and reassembles results in input order.

pub mod analyze;
pub mod compose;
pub mod config;
pub mod imaging;
pub mod loader;
pub mod output;
pub mod package;
pub mod proxy;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
