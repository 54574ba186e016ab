//! Editor configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are the base layer; a user `config.toml` in the working directory (or a
//! file passed with `--config`) overrides individual keys.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [preview]
//! max_size = [1920, 1920]   # Bounding box for previews and batch renders
//! scale_mode = "bilinear"   # Resampling kernel, see `retouch scale-modes`
//!
//! [save]
//! quality = 90              # JPEG quality (1-100)
//! format = "png"            # png | jpeg | webp | tiff
//! message = "Saved"         # Toast shown after a save; empty disables
//!
//! [review]
//! every_n_saves = 5         # Ask for a review every N saves; 0 disables
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use crate::imaging::{IntegerSize, OutputFormat, Quality, ScaleMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Preview rendering (bounding size, resampling).
    pub preview: PreviewConfig,
    /// Output encoding and the success message.
    pub save: SaveConfig,
    /// Review prompt throttling.
    pub review: ReviewConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save.quality == 0 || self.save.quality > 100 {
            return Err(ConfigError::Validation("save.quality must be 1-100".into()));
        }
        if self.preview.max_size[0] == 0 || self.preview.max_size[1] == 0 {
            return Err(ConfigError::Validation(
                "preview.max_size values must be non-zero".into(),
            ));
        }
        if !self.preview.scale_mode.is_present() {
            return Err(ConfigError::Validation(
                "preview.scale_mode must name a scale mode".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn preview_bound(&self) -> IntegerSize {
        IntegerSize::new(self.preview.max_size[0], self.preview.max_size[1])
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.save.quality)
    }

    /// The toast message, or `None` when disabled.
    pub fn save_message(&self) -> Option<&str> {
        Some(self.save.message.as_str()).filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Width and height the source is fitted into. Never upscales.
    pub max_size: [u32; 2],
    pub scale_mode: ScaleMode,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_size: [1920, 1920],
            scale_mode: ScaleMode::Bilinear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveConfig {
    pub quality: u32,
    pub format: OutputFormat,
    pub message: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            format: OutputFormat::Png,
            message: "Saved".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewConfig {
    pub every_n_saves: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { every_n_saves: 5 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for batch renders: all cores unless `max_processes` asks
/// for fewer. Never more than the core count.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    match config.max_processes {
        Some(n) => n.min(cores),
        None => cores,
    }
}

/// [`EditorConfig::default`] as a TOML table.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EditorConfig::default()).expect("default config must serialize")
}

/// Lay `overlay` over `base`. Tables merge key by key; any other overlay
/// value replaces what was underneath.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(top)) => {
            for (key, value) in top {
                let value = match table.remove(&key) {
                    Some(under) => merge_toml(under, value),
                    None => value,
                };
                table.insert(key, value);
            }
            toml::Value::Table(table)
        }
        (_, replacement) => replacement,
    }
}

/// Parse a TOML file without interpreting it. `Ok(None)` if it does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(config_path) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from `dir`, falling back to stock defaults.
pub fn load_config(dir: &Path) -> Result<EditorConfig, ConfigError> {
    load_config_file(&dir.join("config.toml"))
}

/// Load a specific config file over the stock defaults.
pub fn load_config_file(path: &Path) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Retouch Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# retouch reads config.toml from the working directory, or the file
# passed with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Preview rendering
# ---------------------------------------------------------------------------
[preview]
# Bounding box [width, height] that previews and batch renders fit into.
# Images smaller than this are never upscaled.
max_size = [1920, 1920]

# Resampling kernel used when fitting.
# bilinear | nearest | spline | mitchell | lanczos | catmull | hermite |
# bicubic | hann | default
scale_mode = "bilinear"

# ---------------------------------------------------------------------------
# Saving
# ---------------------------------------------------------------------------
[save]
# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# Output format when the output path has no recognised extension.
# png | jpeg | webp | tiff
format = "png"

# Message shown after a successful save. Empty disables the toast.
message = "Saved"

# ---------------------------------------------------------------------------
# Review prompt
# ---------------------------------------------------------------------------
[review]
# Ask for a review every N successful saves. 0 disables.
every_n_saves = 5

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch renders.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
