//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the filters (which decide what a transformation means)
//! and the [`backend`](super::backend) (which does the actual pixel work).
//! This separation allows swapping backends (e.g. for testing with a mock)
//! without changing filter logic.
//!
//! ## Types
//!
//! - [`IntegerSize`]: Target size of a render, in pixels.
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`DitherParams`]: Dithering method, cut level and grayscale flag.
//! - [`Adjustment`]: A single tone/colour operation and its amount.
//! - [`OutputFormat`]: Encoded file format for saves.
//! - [`SaveParams`]: Full specification for a save: output path, format, quality.

use super::dither::DitheringType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Width and height of a requested render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegerSize {
    pub width: u32,
    pub height: u32,
}

impl IntegerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of an existing image.
    pub fn of(image: &image::DynamicImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Largest size with the aspect ratio of `self` that fits inside
    /// `bound`. Never larger than `self`.
    pub fn fit_within(self, bound: IntegerSize) -> IntegerSize {
        if self.width == 0 || self.height == 0 {
            return self;
        }
        if self.width <= bound.width && self.height <= bound.height {
            return self;
        }
        let scale = f64::min(
            bound.width as f64 / self.width as f64,
            bound.height as f64 / self.height as f64,
        );
        IntegerSize {
            width: ((self.width as f64 * scale).round() as u32).max(1),
            height: ((self.height as f64 * scale).round() as u32).max(1),
        }
    }
}

impl fmt::Display for IntegerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for IntegerSize {
    type Err = String;

    /// Parses `WxH`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
        let width = w.trim().parse().map_err(|_| format!("bad width in {s:?}"))?;
        let height = h.trim().parse().map_err(|_| format!("bad height in {s:?}"))?;
        if width == 0 || height == 0 {
            return Err(format!("size must be non-zero, got {s:?}"));
        }
        Ok(Self { width, height })
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Dithering parameters.
///
/// - `threshold`: mean cut level on the 0–255 scale; clamped when applied
/// - `grayscale`: dither luma instead of each colour channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DitherParams {
    pub kind: DitheringType,
    pub threshold: i32,
    pub grayscale: bool,
}

/// A point or block operation applied by [`adjust`](super::adjust::adjust).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Offset added to each channel, in normalised units.
    Brightness(f32),
    /// Multiplier around mid-gray.
    Contrast(f32),
    /// Power applied to each channel.
    Gamma(f32),
    /// Multiplier of the distance from luma.
    Saturation(f32),
    /// Stops of exposure; each stop doubles the channel values.
    Exposure(f32),
    Grayscale,
    Negative,
    Sepia,
    /// Luma cut level on the 0–255 scale.
    Threshold(f32),
    /// Block edge length in pixels.
    Pixelate(u32),
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Tiff,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        OutputFormat::from_path(Path::new(&format!("x.{name}")))
            .ok_or_else(|| format!("unknown output format: {s:?}"))
    }
}

/// Parameters for writing an image to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveParams {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn fit_within_preserves_aspect() {
        let size = IntegerSize::new(4000, 3000);
        assert_eq!(
            size.fit_within(IntegerSize::new(1000, 1000)),
            IntegerSize::new(1000, 750)
        );
        assert_eq!(
            IntegerSize::new(1000, 4000).fit_within(IntegerSize::new(800, 800)),
            IntegerSize::new(200, 800)
        );
    }

    #[test]
    fn fit_within_never_upscales() {
        let size = IntegerSize::new(300, 200);
        assert_eq!(size.fit_within(IntegerSize::new(1920, 1080)), size);
    }

    #[test]
    fn size_parses_from_cli() {
        assert_eq!("1920x1080".parse(), Ok(IntegerSize::new(1920, 1080)));
        assert_eq!("64X32".parse(), Ok(IntegerSize::new(64, 32)));
        assert!("1920".parse::<IntegerSize>().is_err());
        assert!("0x10".parse::<IntegerSize>().is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("a/b.JPEG")),
            Some(OutputFormat::Jpeg)
        );
        assert_eq!(OutputFormat::from_path(Path::new("a/b.avif")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn format_parses_from_cli() {
        assert_eq!("JPG".parse(), Ok(OutputFormat::Jpeg));
        assert_eq!("webp".parse(), Ok(OutputFormat::Webp));
        assert!("avif".parse::<OutputFormat>().is_err());
    }
}
