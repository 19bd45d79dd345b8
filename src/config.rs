//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `listing-pack.toml`. Stock
//! defaults are overridden key-by-key by whatever the user file specifies.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [target]
//! width = 1080
//! height = 1080
//!
//! [analysis]
//! white_threshold = 240            # per-channel minimum for "near white"
//! alpha_threshold = 128            # minimum alpha for a sample to count
//! row_white_fraction = 0.8         # share of samples that must be white
//! scan_fraction = 0.1              # rows inspected from each edge...
//! min_scan_rows = 5                # ...but never fewer than this
//! sample_points = [0.1, 0.3, 0.5, 0.7, 0.9]
//! significant_strip_fraction = 0.05
//! reference_dimension = 1080
//! low_resolution_factor = 0.8
//!
//! [composition]
//! closing_overlay_url = "https://cdn.prod.website-files.com/..."
//! auto_adjust_zoom = 1.17
//! caption_max_chars = 25
//! max_selections = 10
//!
//! [proxy]
//! problematic_hosts = ["ddfcdn.realtor.ca", "mlsphotos.onregional.com"]
//! canonical_host = "ucarecdn.com"
//! cdn_base = "https://ucarecdn.com"
//! upload_base = "https://upload.uploadcare.com"
//! public_key = ""
//! poll_interval_ms = 500
//! max_poll_attempts = 60
//!
//! [network]
//! timeout_secs = 30                # 0 disables the per-request deadline
//! user_agent = "listing-pack/<version>"
//! max_decoded_pixels = 64000000
//!
//! [processing]
//! max_analysis_workers = 4         # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::TargetSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "listing-pack.toml";

/// Full pipeline configuration.
///
/// All fields have defaults matching production behavior. User config files
/// need only specify the values they want to override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Output canvas size.
    pub target: TargetSize,
    /// Strip and low-resolution detection thresholds.
    pub analysis: AnalysisConfig,
    /// Compositing settings (closing overlay, auto-adjust zoom).
    pub composition: CompositionConfig,
    /// CDN mirror settings.
    pub proxy: ProxyConfig,
    /// HTTP client settings.
    pub network: NetworkConfig,
    /// Analysis fan-out settings.
    pub processing: ProcessingConfig,
}

impl PackageConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.width == 0 || self.target.height == 0 {
            return Err(ConfigError::Validation(
                "target.width and target.height must be non-zero".into(),
            ));
        }
        let a = &self.analysis;
        for (name, value) in [
            ("analysis.row_white_fraction", a.row_white_fraction),
            ("analysis.scan_fraction", a.scan_fraction),
            ("analysis.significant_strip_fraction", a.significant_strip_fraction),
            ("analysis.low_resolution_factor", a.low_resolution_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!("{name} must be 0.0-1.0")));
            }
        }
        if a.sample_points.is_empty() {
            return Err(ConfigError::Validation(
                "analysis.sample_points must not be empty".into(),
            ));
        }
        if a.sample_points.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(ConfigError::Validation(
                "analysis.sample_points values must be 0.0-1.0".into(),
            ));
        }
        if self.composition.auto_adjust_zoom < 1.0 {
            return Err(ConfigError::Validation(
                "composition.auto_adjust_zoom must be >= 1.0".into(),
            ));
        }
        if self.composition.max_selections == 0 {
            return Err(ConfigError::Validation(
                "composition.max_selections must be non-zero".into(),
            ));
        }
        if self.proxy.max_poll_attempts == 0 {
            return Err(ConfigError::Validation(
                "proxy.max_poll_attempts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Strip-artifact and resolution thresholds. Empirical tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Minimum value of each RGB channel for a sample to be "near white".
    pub white_threshold: u8,
    /// Minimum alpha for a near-white sample to count.
    pub alpha_threshold: u8,
    /// Share of a row's samples that must be near white for the row to be white.
    pub row_white_fraction: f64,
    /// Share of the height inspected from each edge.
    pub scan_fraction: f64,
    /// Lower bound on rows inspected from each edge.
    pub min_scan_rows: u32,
    /// Horizontal sample positions as fractions of the width.
    pub sample_points: Vec<f64>,
    /// Combined white rows (top + bottom) as a share of height that flags strips.
    pub significant_strip_fraction: f64,
    /// Edge length the low-resolution check compares against.
    pub reference_dimension: u32,
    /// Either edge below `reference_dimension * low_resolution_factor` is low-res.
    pub low_resolution_factor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            white_threshold: 240,
            alpha_threshold: 128,
            row_white_fraction: 0.8,
            scan_fraction: 0.10,
            min_scan_rows: 5,
            sample_points: vec![0.1, 0.3, 0.5, 0.7, 0.9],
            significant_strip_fraction: 0.05,
            reference_dimension: 1080,
            low_resolution_factor: 0.8,
        }
    }
}

/// Compositing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositionConfig {
    /// Fixed overlay drawn over the last image of every package.
    pub closing_overlay_url: String,
    /// Shrink factor applied to the default square by auto-adjust.
    pub auto_adjust_zoom: f64,
    /// Filename characters shown on the error placeholder before `...`.
    pub caption_max_chars: usize,
    /// Maximum number of photos in one package.
    pub max_selections: usize,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            closing_overlay_url: "https://cdn.prod.website-files.com/651d8cc426674e7695b3aaf4/683751a58e87589038656ccb_10.png".to_string(),
            auto_adjust_zoom: 1.17,
            caption_max_chars: 25,
            max_selections: 10,
        }
    }
}

/// CDN mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Hosts whose images must always be mirrored before loading.
    pub problematic_hosts: Vec<String>,
    /// Host of already-mirrored (canonical) URLs.
    pub canonical_host: String,
    /// Base URL canonical asset URLs are built from.
    pub cdn_base: String,
    /// Base URL of the mirror's upload API.
    pub upload_base: String,
    /// Mirror project public key. Empty disables mirroring.
    pub public_key: String,
    /// Delay between mirror status checks.
    pub poll_interval_ms: u64,
    /// Status checks before giving up on a mirror job.
    pub max_poll_attempts: u32,
}

impl ProxyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            problematic_hosts: vec![
                "ddfcdn.realtor.ca".to_string(),
                "mlsphotos.onregional.com".to_string(),
            ],
            canonical_host: "ucarecdn.com".to_string(),
            cdn_base: "https://ucarecdn.com".to_string(),
            upload_base: "https://upload.uploadcare.com".to_string(),
            public_key: String::new(),
            poll_interval_ms: 500,
            max_poll_attempts: 60,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Per-request deadline in seconds. `0` disables it.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Decode budget per bitmap.
    pub max_decoded_pixels: u64,
}

impl NetworkConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("listing-pack/", env!("CARGO_PKG_VERSION")).to_string(),
            max_decoded_pixels: crate::imaging::rust_backend::DEFAULT_MAX_DECODED_PIXELS,
        }
    }
}

/// Analysis fan-out settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel analysis workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_analysis_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_analysis_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PackageConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PackageConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PackageConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<PackageConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# listing-pack Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output canvas
# ---------------------------------------------------------------------------
[target]
width = 1080
height = 1080

# ---------------------------------------------------------------------------
# Pre-flight analysis
# ---------------------------------------------------------------------------
[analysis]
# A sample is "near white" when R, G and B are all >= this value...
white_threshold = 240
# ...and its alpha is >= this value.
alpha_threshold = 128
# A row is white when this share of its samples is near white.
row_white_fraction = 0.8
# Rows inspected from each edge: max(min_scan_rows, height * scan_fraction).
scan_fraction = 0.1
min_scan_rows = 5
# Horizontal sample positions as fractions of the width.
sample_points = [0.1, 0.3, 0.5, 0.7, 0.9]
# Top + bottom white rows at or above this share of height flags strips.
significant_strip_fraction = 0.05
# Either edge below reference_dimension * low_resolution_factor is low-res.
reference_dimension = 1080
low_resolution_factor = 0.8

# ---------------------------------------------------------------------------
# Compositing
# ---------------------------------------------------------------------------
[composition]
# Drawn full-canvas over the last image of every package.
closing_overlay_url = "https://cdn.prod.website-files.com/651d8cc426674e7695b3aaf4/683751a58e87589038656ccb_10.png"
# Auto-adjust shrinks the centered square by this factor.
auto_adjust_zoom = 1.17
# Filename characters shown on the error placeholder.
caption_max_chars = 25
# Maximum number of photos in one package.
max_selections = 10

# ---------------------------------------------------------------------------
# CDN mirror
# ---------------------------------------------------------------------------
[proxy]
# Images from these hosts are always mirrored before loading.
problematic_hosts = ["ddfcdn.realtor.ca", "mlsphotos.onregional.com"]
canonical_host = "ucarecdn.com"
cdn_base = "https://ucarecdn.com"
upload_base = "https://upload.uploadcare.com"
# Mirror project public key. Leave empty to disable mirroring.
public_key = ""
poll_interval_ms = 500
max_poll_attempts = 60

# ---------------------------------------------------------------------------
# Network
# ---------------------------------------------------------------------------
[network]
# Per-request deadline in seconds (0 = none).
timeout_secs = 30
# user_agent = "listing-pack/<version>"
max_decoded_pixels = 64000000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel analysis workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_analysis_workers = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        PackageConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_production_thresholds() {
        let config = PackageConfig::default();
        assert_eq!(config.target, TargetSize::square(1080));
        assert_eq!(config.analysis.white_threshold, 240);
        assert_eq!(config.analysis.sample_points.len(), 5);
        assert_eq!(config.composition.auto_adjust_zoom, 1.17);
        assert_eq!(config.network.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn stock_toml_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        let defaults = PackageConfig::default();
        assert_eq!(config.analysis.min_scan_rows, defaults.analysis.min_scan_rows);
        assert_eq!(
            config.composition.closing_overlay_url,
            defaults.composition.closing_overlay_url
        );
        assert_eq!(config.proxy.problematic_hosts, defaults.proxy.problematic_hosts);
    }

    #[test]
    fn merge_overrides_only_given_keys() {
        let overlay: toml::Value = toml::from_str(
            r#"
            [analysis]
            white_threshold = 230
            "#,
        )
        .unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.analysis.white_threshold, 230);
        assert_eq!(config.analysis.alpha_threshold, 128);
        assert_eq!(config.target.width, 1080);
    }

    #[test]
    fn unknown_keys_rejected() {
        let overlay: toml::Value = toml::from_str("[analysis]\nwhite_treshold = 230\n").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_fraction() {
        let overlay: toml::Value = toml::from_str("[analysis]\nscan_fraction = 1.5\n").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validation_rejects_zoom_below_one() {
        let mut config = PackageConfig::default();
        config.composition.auto_adjust_zoom = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let network = NetworkConfig {
            timeout_secs: 0,
            ..NetworkConfig::default()
        };
        assert_eq!(network.timeout(), None);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.target.height, 1080);
    }

    #[test]
    fn load_file_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[target]\nwidth = 540\nheight = 540\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.target, TargetSize::square(540));
    }

    #[test]
    fn effective_workers_caps_at_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_analysis_workers: Some(10_000),
        };
        assert_eq!(effective_workers(&config), cores);
        let one = ProcessingConfig {
            max_analysis_workers: Some(0),
        };
        assert_eq!(effective_workers(&one), 1);
    }
}
