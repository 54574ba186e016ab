//! Named resampling strategies with stable integer codes.
//!
//! The integer codes are an interchange format: presets, saved sessions and
//! callers on the other side of an FFI boundary refer to scale modes by
//! number. The codes never change once assigned.
//!
//! | Mode | Code |
//! |---|---|
//! | `NotPresent` | -2 |
//! | `Default` | -1 |
//! | `Bilinear` | 0 |
//! | `Nearest` | 1 |
//! | `Spline` | 2 |
//! | `Mitchell` | 3 |
//! | `Lanczos` | 4 |
//! | `Catmull` | 5 |
//! | `Hermite` | 6 |
//! | `Bicubic` | 7 |
//! | `Hann` | 8 |
//!
//! Lookup by code is total: anything outside the table is `NotPresent`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMode {
    NotPresent,
    #[default]
    Default,
    Bilinear,
    Nearest,
    Spline,
    Mitchell,
    Lanczos,
    Catmull,
    Hermite,
    Bicubic,
    Hann,
}

impl ScaleMode {
    /// Picklist order. `NotPresent` is a sentinel and never offered.
    pub const ENTRIES: [ScaleMode; 10] = [
        ScaleMode::Default,
        ScaleMode::Bilinear,
        ScaleMode::Nearest,
        ScaleMode::Spline,
        ScaleMode::Mitchell,
        ScaleMode::Lanczos,
        ScaleMode::Catmull,
        ScaleMode::Hermite,
        ScaleMode::Bicubic,
        ScaleMode::Hann,
    ];

    pub fn value(self) -> i32 {
        match self {
            ScaleMode::NotPresent => -2,
            ScaleMode::Default => -1,
            ScaleMode::Bilinear => 0,
            ScaleMode::Nearest => 1,
            ScaleMode::Spline => 2,
            ScaleMode::Mitchell => 3,
            ScaleMode::Lanczos => 4,
            ScaleMode::Catmull => 5,
            ScaleMode::Hermite => 6,
            ScaleMode::Bicubic => 7,
            ScaleMode::Hann => 8,
        }
    }

    /// Never fails. Unknown codes, including -2 itself, map to `NotPresent`.
    pub fn from_int(value: i32) -> ScaleMode {
        match value {
            -1 => ScaleMode::Default,
            0 => ScaleMode::Bilinear,
            1 => ScaleMode::Nearest,
            2 => ScaleMode::Spline,
            3 => ScaleMode::Mitchell,
            4 => ScaleMode::Lanczos,
            5 => ScaleMode::Catmull,
            6 => ScaleMode::Hermite,
            7 => ScaleMode::Bicubic,
            8 => ScaleMode::Hann,
            _ => ScaleMode::NotPresent,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::NotPresent => "not-present",
            ScaleMode::Default => "default",
            ScaleMode::Bilinear => "bilinear",
            ScaleMode::Nearest => "nearest",
            ScaleMode::Spline => "spline",
            ScaleMode::Mitchell => "mitchell",
            ScaleMode::Lanczos => "lanczos",
            ScaleMode::Catmull => "catmull",
            ScaleMode::Hermite => "hermite",
            ScaleMode::Bicubic => "bicubic",
            ScaleMode::Hann => "hann",
        }
    }

    /// Case-insensitive name lookup with the same sentinel fallback as
    /// [`from_int`](Self::from_int).
    pub fn from_name(name: &str) -> ScaleMode {
        name.parse().unwrap_or(ScaleMode::NotPresent)
    }

    /// The concrete strategy the resampler runs for this mode.
    pub fn resolve(self) -> ScaleMode {
        match self {
            ScaleMode::Default | ScaleMode::NotPresent => ScaleMode::Bilinear,
            other => other,
        }
    }

    pub fn is_present(self) -> bool {
        self != ScaleMode::NotPresent
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for [`ScaleMode::from_str`]; the strict counterpart of
/// [`ScaleMode::from_name`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scale mode: {0}")]
pub struct UnknownScaleMode(pub String);

impl FromStr for ScaleMode {
    type Err = UnknownScaleMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ScaleMode::ENTRIES
            .into_iter()
            .chain(std::iter::once(ScaleMode::NotPresent))
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| UnknownScaleMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_entry() {
        for mode in ScaleMode::ENTRIES {
            assert_eq!(ScaleMode::from_int(mode.value()), mode);
        }
    }

    #[test]
    fn unknown_codes_map_to_not_present() {
        for code in [-3, -2, 9, 42, i32::MIN, i32::MAX] {
            assert_eq!(ScaleMode::from_int(code), ScaleMode::NotPresent);
        }
    }

    #[test]
    fn entries_keep_picklist_order() {
        let codes: Vec<i32> = ScaleMode::ENTRIES.iter().map(|m| m.value()).collect();
        assert_eq!(codes, vec![-1, 0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(!ScaleMode::ENTRIES.contains(&ScaleMode::NotPresent));
    }

    #[test]
    fn names_parse_back() {
        for mode in ScaleMode::ENTRIES {
            assert_eq!(mode.name().parse::<ScaleMode>(), Ok(mode));
        }
        assert_eq!("LANCZOS".parse::<ScaleMode>(), Ok(ScaleMode::Lanczos));
    }

    #[test]
    fn unknown_name_is_error_or_sentinel() {
        assert!("box".parse::<ScaleMode>().is_err());
        assert_eq!(ScaleMode::from_name("box"), ScaleMode::NotPresent);
    }

    #[test]
    fn default_and_sentinel_resolve_to_bilinear() {
        assert_eq!(ScaleMode::Default.resolve(), ScaleMode::Bilinear);
        assert_eq!(ScaleMode::NotPresent.resolve(), ScaleMode::Bilinear);
        assert_eq!(ScaleMode::Hann.resolve(), ScaleMode::Hann);
    }

    #[test]
    fn serializes_by_name() {
        let json = serde_json::to_string(&ScaleMode::Catmull).unwrap();
        assert_eq!(json, "\"catmull\"");
        let back: ScaleMode = serde_json::from_str("\"not-present\"").unwrap();
        assert_eq!(back, ScaleMode::NotPresent);
    }
}
