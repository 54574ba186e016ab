//! Filters: immutable image operations with stable cache keys.
//!
//! A [`Filter`] is a value. It names one operation and carries that
//! operation's parameter value. It never changes after construction: editing
//! a filter means building a new one with [`Filter::with_value`] and putting
//! it in the old one's place in a [`FilterList`].
//!
//! # Cache keys
//!
//! [`Transformation::cache_key`] is a SHA-256 (lowercase hex) over the
//! filter's kind name and a canonical encoding of its parameter value. It is
//! computed from the parameters alone; the image is never touched.
//!
//! Floats are canonicalised before they are hashed or compared:
//!
//! - every NaN payload collapses to one quiet NaN
//! - `-0.0` becomes `0.0`
//!
//! [`PartialEq`] uses the same canonical form. Two filters that compare equal
//! therefore always hash to the same key, even when their parameters are NaN.
//!
//! # Transformation
//!
//! [`Filter::apply`] maps the filter onto a single [`ImageBackend`] call. The
//! filter only chooses parameters; the pixel work belongs to the backend.
//! Failures carry the backend's error as their source and are never
//! swallowed.
//!
//! # Text form
//!
//! Filters parse from and print to a compact form used by the CLI and by
//! output formatting:
//!
//! ```text
//! negative
//! contrast:1.4
//! bayer-two-dithering:180,true
//! ```
//!
//! A bare kind name gives the kind's default value.

pub mod list;

pub use list::{FilterList, FilterListError};

use crate::imaging::{
    Adjustment, BackendError, DitherParams, DitheringType, ImageBackend, IntegerSize, RustBackend,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("{kind} failed: {source}")]
    Backend {
        kind: FilterKind,
        #[source]
        source: BackendError,
    },
    #[error("{kind} does not take {value}")]
    ValueMismatch { kind: FilterKind, value: FilterValue },
    #[error("Invalid filter: {0}")]
    Parse(String),
}

/// An image operation that can be memoised by key.
pub trait Transformation {
    /// Deterministic key for the transformation's parameters.
    fn cache_key(&self) -> String;

    /// Produce a new image from `input`. `size` is the size of the render
    /// being requested.
    fn transform(
        &self,
        input: &DynamicImage,
        size: IntegerSize,
    ) -> Result<DynamicImage, FilterError>;
}

// ============================================================================
// Kinds and values
// ============================================================================

/// The shape of a filter's parameter.
#[derive(Debug, Clone, Copy)]
pub enum FilterValue {
    Unit,
    Float(f32),
    FloatBool(f32, bool),
}

/// Bit pattern used for hashing and equality.
fn canonical_bits(v: f32) -> u32 {
    if v.is_nan() {
        f32::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl FilterValue {
    fn write_canonical(&self, hasher: &mut Sha256) {
        match *self {
            FilterValue::Unit => hasher.update([0u8]),
            FilterValue::Float(v) => {
                hasher.update([1u8]);
                hasher.update(canonical_bits(v).to_le_bytes());
            }
            FilterValue::FloatBool(v, b) => {
                hasher.update([2u8]);
                hasher.update(canonical_bits(v).to_le_bytes());
                hasher.update([b as u8]);
            }
        }
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (FilterValue::Unit, FilterValue::Unit) => true,
            (FilterValue::Float(a), FilterValue::Float(b)) => canonical_bits(a) == canonical_bits(b),
            (FilterValue::FloatBool(a, x), FilterValue::FloatBool(b, y)) => {
                canonical_bits(a) == canonical_bits(b) && x == y
            }
            _ => false,
        }
    }
}

impl Eq for FilterValue {}

impl Hash for FilterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            FilterValue::Unit => 0u8.hash(state),
            FilterValue::Float(v) => {
                1u8.hash(state);
                canonical_bits(v).hash(state);
            }
            FilterValue::FloatBool(v, b) => {
                2u8.hash(state);
                canonical_bits(v).hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Unit => f.write_str("no value"),
            FilterValue::Float(v) => write!(f, "{v}"),
            FilterValue::FloatBool(v, b) => write!(f, "{v},{b}"),
        }
    }
}

/// Every filter kind, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Gamma,
    Saturation,
    Exposure,
    Grayscale,
    Negative,
    Sepia,
    Threshold,
    Pixelation,
    BayerTwoDithering,
    BayerThreeDithering,
    BayerFourDithering,
    BayerEightDithering,
    FloydSteinbergDithering,
    AtkinsonDithering,
    SierraLiteDithering,
}

impl FilterKind {
    pub const ALL: [FilterKind; 17] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Gamma,
        FilterKind::Saturation,
        FilterKind::Exposure,
        FilterKind::Grayscale,
        FilterKind::Negative,
        FilterKind::Sepia,
        FilterKind::Threshold,
        FilterKind::Pixelation,
        FilterKind::BayerTwoDithering,
        FilterKind::BayerThreeDithering,
        FilterKind::BayerFourDithering,
        FilterKind::BayerEightDithering,
        FilterKind::FloydSteinbergDithering,
        FilterKind::AtkinsonDithering,
        FilterKind::SierraLiteDithering,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Gamma => "gamma",
            FilterKind::Saturation => "saturation",
            FilterKind::Exposure => "exposure",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Negative => "negative",
            FilterKind::Sepia => "sepia",
            FilterKind::Threshold => "threshold",
            FilterKind::Pixelation => "pixelation",
            FilterKind::BayerTwoDithering => "bayer-two-dithering",
            FilterKind::BayerThreeDithering => "bayer-three-dithering",
            FilterKind::BayerFourDithering => "bayer-four-dithering",
            FilterKind::BayerEightDithering => "bayer-eight-dithering",
            FilterKind::FloydSteinbergDithering => "floyd-steinberg-dithering",
            FilterKind::AtkinsonDithering => "atkinson-dithering",
            FilterKind::SierraLiteDithering => "sierra-lite-dithering",
        }
    }

    pub fn from_name(name: &str) -> Option<FilterKind> {
        let wanted = name.trim().to_ascii_lowercase();
        FilterKind::ALL.into_iter().find(|k| k.name() == wanted)
    }

    /// A fresh filter of this kind with its default parameters.
    pub fn default_filter(self) -> Filter {
        const DITHER_DEFAULT: (f32, bool) = (200.0, false);
        match self {
            FilterKind::Brightness => Filter::Brightness { value: 0.0 },
            FilterKind::Contrast => Filter::Contrast { value: 1.0 },
            FilterKind::Gamma => Filter::Gamma { value: 1.0 },
            FilterKind::Saturation => Filter::Saturation { value: 1.0 },
            FilterKind::Exposure => Filter::Exposure { value: 0.0 },
            FilterKind::Grayscale => Filter::Grayscale,
            FilterKind::Negative => Filter::Negative,
            FilterKind::Sepia => Filter::Sepia,
            FilterKind::Threshold => Filter::Threshold { value: 128.0 },
            FilterKind::Pixelation => Filter::Pixelation { value: 25.0 },
            FilterKind::BayerTwoDithering => Filter::BayerTwoDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::BayerThreeDithering => Filter::BayerThreeDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::BayerFourDithering => Filter::BayerFourDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::BayerEightDithering => Filter::BayerEightDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::FloydSteinbergDithering => Filter::FloydSteinbergDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::AtkinsonDithering => Filter::AtkinsonDithering {
                value: DITHER_DEFAULT,
            },
            FilterKind::SierraLiteDithering => Filter::SierraLiteDithering {
                value: DITHER_DEFAULT,
            },
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Filter
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Filter {
    Brightness { value: f32 },
    Contrast { value: f32 },
    Gamma { value: f32 },
    Saturation { value: f32 },
    Exposure { value: f32 },
    Grayscale,
    Negative,
    Sepia,
    Threshold { value: f32 },
    Pixelation { value: f32 },
    BayerTwoDithering { value: (f32, bool) },
    BayerThreeDithering { value: (f32, bool) },
    BayerFourDithering { value: (f32, bool) },
    BayerEightDithering { value: (f32, bool) },
    FloydSteinbergDithering { value: (f32, bool) },
    AtkinsonDithering { value: (f32, bool) },
    SierraLiteDithering { value: (f32, bool) },
}

impl Filter {
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Brightness { .. } => FilterKind::Brightness,
            Filter::Contrast { .. } => FilterKind::Contrast,
            Filter::Gamma { .. } => FilterKind::Gamma,
            Filter::Saturation { .. } => FilterKind::Saturation,
            Filter::Exposure { .. } => FilterKind::Exposure,
            Filter::Grayscale => FilterKind::Grayscale,
            Filter::Negative => FilterKind::Negative,
            Filter::Sepia => FilterKind::Sepia,
            Filter::Threshold { .. } => FilterKind::Threshold,
            Filter::Pixelation { .. } => FilterKind::Pixelation,
            Filter::BayerTwoDithering { .. } => FilterKind::BayerTwoDithering,
            Filter::BayerThreeDithering { .. } => FilterKind::BayerThreeDithering,
            Filter::BayerFourDithering { .. } => FilterKind::BayerFourDithering,
            Filter::BayerEightDithering { .. } => FilterKind::BayerEightDithering,
            Filter::FloydSteinbergDithering { .. } => FilterKind::FloydSteinbergDithering,
            Filter::AtkinsonDithering { .. } => FilterKind::AtkinsonDithering,
            Filter::SierraLiteDithering { .. } => FilterKind::SierraLiteDithering,
        }
    }

    pub fn value(&self) -> FilterValue {
        match *self {
            Filter::Grayscale | Filter::Negative | Filter::Sepia => FilterValue::Unit,
            Filter::Brightness { value }
            | Filter::Contrast { value }
            | Filter::Gamma { value }
            | Filter::Saturation { value }
            | Filter::Exposure { value }
            | Filter::Threshold { value }
            | Filter::Pixelation { value } => FilterValue::Float(value),
            Filter::BayerTwoDithering { value: (v, b) }
            | Filter::BayerThreeDithering { value: (v, b) }
            | Filter::BayerFourDithering { value: (v, b) }
            | Filter::BayerEightDithering { value: (v, b) }
            | Filter::FloydSteinbergDithering { value: (v, b) }
            | Filter::AtkinsonDithering { value: (v, b) }
            | Filter::SierraLiteDithering { value: (v, b) } => FilterValue::FloatBool(v, b),
        }
    }

    /// Build a filter of `kind` carrying `value`.
    pub fn from_parts(kind: FilterKind, value: FilterValue) -> Result<Filter, FilterError> {
        let mismatch = || FilterError::ValueMismatch { kind, value };
        let filter = match (kind, value) {
            (FilterKind::Grayscale, FilterValue::Unit) => Filter::Grayscale,
            (FilterKind::Negative, FilterValue::Unit) => Filter::Negative,
            (FilterKind::Sepia, FilterValue::Unit) => Filter::Sepia,
            (FilterKind::Brightness, FilterValue::Float(value)) => Filter::Brightness { value },
            (FilterKind::Contrast, FilterValue::Float(value)) => Filter::Contrast { value },
            (FilterKind::Gamma, FilterValue::Float(value)) => Filter::Gamma { value },
            (FilterKind::Saturation, FilterValue::Float(value)) => Filter::Saturation { value },
            (FilterKind::Exposure, FilterValue::Float(value)) => Filter::Exposure { value },
            (FilterKind::Threshold, FilterValue::Float(value)) => Filter::Threshold { value },
            (FilterKind::Pixelation, FilterValue::Float(value)) => Filter::Pixelation { value },
            (FilterKind::BayerTwoDithering, FilterValue::FloatBool(v, b)) => {
                Filter::BayerTwoDithering { value: (v, b) }
            }
            (FilterKind::BayerThreeDithering, FilterValue::FloatBool(v, b)) => {
                Filter::BayerThreeDithering { value: (v, b) }
            }
            (FilterKind::BayerFourDithering, FilterValue::FloatBool(v, b)) => {
                Filter::BayerFourDithering { value: (v, b) }
            }
            (FilterKind::BayerEightDithering, FilterValue::FloatBool(v, b)) => {
                Filter::BayerEightDithering { value: (v, b) }
            }
            (FilterKind::FloydSteinbergDithering, FilterValue::FloatBool(v, b)) => {
                Filter::FloydSteinbergDithering { value: (v, b) }
            }
            (FilterKind::AtkinsonDithering, FilterValue::FloatBool(v, b)) => {
                Filter::AtkinsonDithering { value: (v, b) }
            }
            (FilterKind::SierraLiteDithering, FilterValue::FloatBool(v, b)) => {
                Filter::SierraLiteDithering { value: (v, b) }
            }
            _ => return Err(mismatch()),
        };
        Ok(filter)
    }

    /// A copy of this filter with a new parameter value. The kind never
    /// changes; a value of the wrong shape is an error.
    pub fn with_value(&self, value: FilterValue) -> Result<Filter, FilterError> {
        Filter::from_parts(self.kind(), value)
    }

    /// Run the filter through `backend`.
    pub fn apply(
        &self,
        backend: &impl ImageBackend,
        input: &DynamicImage,
        _size: IntegerSize,
    ) -> Result<DynamicImage, FilterError> {
        let result = match self.operation() {
            Operation::Dither(params) => backend.dither(input, &params),
            Operation::Adjust(adjustment) => backend.adjust(input, &adjustment),
        };
        result.map_err(|source| FilterError::Backend {
            kind: self.kind(),
            source,
        })
    }

    fn operation(&self) -> Operation {
        let dither = |kind, (threshold, grayscale): (f32, bool)| {
            Operation::Dither(DitherParams {
                kind,
                // Truncates toward zero, NaN becomes 0
                threshold: threshold as i32,
                grayscale,
            })
        };
        match *self {
            Filter::Brightness { value } => Operation::Adjust(Adjustment::Brightness(value)),
            Filter::Contrast { value } => Operation::Adjust(Adjustment::Contrast(value)),
            Filter::Gamma { value } => Operation::Adjust(Adjustment::Gamma(value)),
            Filter::Saturation { value } => Operation::Adjust(Adjustment::Saturation(value)),
            Filter::Exposure { value } => Operation::Adjust(Adjustment::Exposure(value)),
            Filter::Grayscale => Operation::Adjust(Adjustment::Grayscale),
            Filter::Negative => Operation::Adjust(Adjustment::Negative),
            Filter::Sepia => Operation::Adjust(Adjustment::Sepia),
            Filter::Threshold { value } => Operation::Adjust(Adjustment::Threshold(value)),
            Filter::Pixelation { value } => {
                Operation::Adjust(Adjustment::Pixelate(value.max(1.0) as u32))
            }
            Filter::BayerTwoDithering { value } => dither(DitheringType::BayerTwo, value),
            Filter::BayerThreeDithering { value } => dither(DitheringType::BayerThree, value),
            Filter::BayerFourDithering { value } => dither(DitheringType::BayerFour, value),
            Filter::BayerEightDithering { value } => dither(DitheringType::BayerEight, value),
            Filter::FloydSteinbergDithering { value } => {
                dither(DitheringType::FloydSteinberg, value)
            }
            Filter::AtkinsonDithering { value } => dither(DitheringType::Atkinson, value),
            Filter::SierraLiteDithering { value } => dither(DitheringType::SierraLite, value),
        }
    }
}

/// The single backend call a filter maps to.
enum Operation {
    Dither(DitherParams),
    Adjust(Adjustment),
}

impl Transformation for Filter {
    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind().name().as_bytes());
        hasher.update(b"\0");
        self.value().write_canonical(&mut hasher);
        format!("{:x}", hasher.finalize())
    }

    fn transform(
        &self,
        input: &DynamicImage,
        size: IntegerSize,
    ) -> Result<DynamicImage, FilterError> {
        self.apply(&RustBackend::new(), input, size)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.value() == other.value()
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.value().hash(state);
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            FilterValue::Unit => write!(f, "{}", self.kind()),
            value => write!(f, "{}:{}", self.kind(), value),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = match s.split_once(':') {
            Some((name, args)) => (name, Some(args)),
            None => (s, None),
        };
        let kind = FilterKind::from_name(name)
            .ok_or_else(|| FilterError::Parse(format!("unknown filter {:?}", name.trim())))?;
        let default = kind.default_filter();
        let Some(args) = args else {
            return Ok(default);
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let parse_float = |p: &str| {
            p.parse::<f32>()
                .map_err(|_| FilterError::Parse(format!("{kind}: {p:?} is not a number")))
        };
        let value = match (default.value(), parts.as_slice()) {
            (FilterValue::Unit, _) => {
                return Err(FilterError::Parse(format!("{kind} takes no value")));
            }
            (FilterValue::Float(_), [v]) => FilterValue::Float(parse_float(v)?),
            (FilterValue::FloatBool(_, fallback), [v]) => {
                FilterValue::FloatBool(parse_float(v)?, fallback)
            }
            (FilterValue::FloatBool(_, _), [v, b]) => {
                let flag = b
                    .parse::<bool>()
                    .map_err(|_| FilterError::Parse(format!("{kind}: {b:?} is not a bool")))?;
                FilterValue::FloatBool(parse_float(v)?, flag)
            }
            _ => {
                return Err(FilterError::Parse(format!(
                    "{kind}: wrong number of values in {args:?}"
                )));
            }
        };
        Filter::from_parts(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::{Rgb, RgbImage};

    fn size() -> IntegerSize {
        IntegerSize::new(64, 64)
    }

    // =========================================================================
    // Cache keys
    // =========================================================================

    #[test]
    fn equal_filters_share_a_key() {
        let a = Filter::Contrast { value: 1.25 };
        let b = Filter::Contrast { value: 1.25 };
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn nan_parameters_are_consistent() {
        let quiet = Filter::Gamma { value: f32::NAN };
        let other_payload = Filter::Gamma {
            value: f32::from_bits(0x7fc0_0001),
        };
        assert!(other_payload.value() == quiet.value());
        assert_eq!(quiet, other_payload);
        assert_eq!(quiet.cache_key(), other_payload.cache_key());
    }

    #[test]
    fn signed_zero_is_one_value() {
        let pos = Filter::Brightness { value: 0.0 };
        let neg = Filter::Brightness { value: -0.0 };
        assert_eq!(pos, neg);
        assert_eq!(pos.cache_key(), neg.cache_key());
    }

    #[test]
    fn different_parameters_change_the_key() {
        let base = Filter::BayerTwoDithering {
            value: (200.0, false),
        };
        let threshold = Filter::BayerTwoDithering {
            value: (201.0, false),
        };
        let gray = Filter::BayerTwoDithering {
            value: (200.0, true),
        };
        assert_ne!(base.cache_key(), threshold.cache_key());
        assert_ne!(base.cache_key(), gray.cache_key());
    }

    #[test]
    fn same_value_different_kind_changes_the_key() {
        let a = Filter::Gamma { value: 1.0 };
        let b = Filter::Contrast { value: 1.0 };
        assert_ne!(a, b);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn key_is_sha256_hex() {
        let key = Filter::Negative.cache_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // =========================================================================
    // Values
    // =========================================================================

    #[test]
    fn with_value_keeps_kind() {
        let f = Filter::Contrast { value: 1.0 };
        let g = f.with_value(FilterValue::Float(2.0)).unwrap();
        assert_eq!(g, Filter::Contrast { value: 2.0 });
        // The original is untouched
        assert_eq!(f, Filter::Contrast { value: 1.0 });
    }

    #[test]
    fn with_value_rejects_wrong_shape() {
        let f = Filter::BayerFourDithering {
            value: (200.0, false),
        };
        let err = f.with_value(FilterValue::Float(3.0)).unwrap_err();
        assert!(matches!(
            err,
            FilterError::ValueMismatch {
                kind: FilterKind::BayerFourDithering,
                ..
            }
        ));
    }

    #[test]
    fn defaults_round_trip_through_parts() {
        for kind in FilterKind::ALL {
            let f = kind.default_filter();
            assert_eq!(f.kind(), kind);
            assert_eq!(Filter::from_parts(kind, f.value()).unwrap(), f);
        }
    }

    // =========================================================================
    // Backend dispatch
    // =========================================================================

    #[test]
    fn bayer_two_forwards_truncated_threshold() {
        let backend = MockBackend::new();
        let img = DynamicImage::new_rgb8(2, 2);
        Filter::BayerTwoDithering {
            value: (199.9, true),
        }
        .apply(&backend, &img, size())
        .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Dither {
                kind: DitheringType::BayerTwo,
                threshold: 199,
                grayscale: true,
            }]
        );
    }

    #[test]
    fn tone_filters_become_adjustments() {
        let backend = MockBackend::new();
        let img = DynamicImage::new_rgb8(2, 2);
        Filter::Pixelation { value: 0.2 }
            .apply(&backend, &img, size())
            .unwrap();
        Filter::Sepia.apply(&backend, &img, size()).unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Adjust(Adjustment::Pixelate(1)),
                RecordedOp::Adjust(Adjustment::Sepia),
            ]
        );
    }

    #[test]
    fn backend_failure_carries_cause() {
        let backend = MockBackend::failing("native routine crashed");
        let img = DynamicImage::new_rgb8(2, 2);
        let err = Filter::Negative.apply(&backend, &img, size()).unwrap_err();

        assert!(matches!(
            err,
            FilterError::Backend {
                kind: FilterKind::Negative,
                ..
            }
        ));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("native routine crashed"));
    }

    #[test]
    fn transform_does_not_mutate_input() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
        let before = img.as_bytes().to_vec();
        let out = Filter::Negative.transform(&img, size()).unwrap();
        assert_eq!(img.as_bytes(), before.as_slice());
        assert_ne!(out.as_bytes(), before.as_slice());
    }

    // =========================================================================
    // Text and serde forms
    // =========================================================================

    #[test]
    fn parses_bare_kind_as_default() {
        let f: Filter = "bayer-two-dithering".parse().unwrap();
        assert_eq!(
            f,
            Filter::BayerTwoDithering {
                value: (200.0, false)
            }
        );
    }

    #[test]
    fn parses_values() {
        assert_eq!(
            "contrast:1.4".parse::<Filter>().unwrap(),
            Filter::Contrast { value: 1.4 }
        );
        assert_eq!(
            "atkinson-dithering: 90 , true".parse::<Filter>().unwrap(),
            Filter::AtkinsonDithering {
                value: (90.0, true)
            }
        );
        assert_eq!(
            "floyd-steinberg-dithering:90".parse::<Filter>().unwrap(),
            Filter::FloydSteinbergDithering {
                value: (90.0, false)
            }
        );
    }

    #[test]
    fn rejects_bad_specs() {
        assert!("blur".parse::<Filter>().is_err());
        assert!("negative:1".parse::<Filter>().is_err());
        assert!("contrast:high".parse::<Filter>().is_err());
        assert!("contrast:1,2".parse::<Filter>().is_err());
        assert!("bayer-two-dithering:1,maybe".parse::<Filter>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for kind in FilterKind::ALL {
            let f = kind.default_filter();
            assert_eq!(f.to_string().parse::<Filter>().unwrap(), f);
        }
    }

    #[test]
    fn serde_uses_kind_tag() {
        let json = serde_json::to_string(&Filter::BayerTwoDithering {
            value: (200.0, false),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"bayer-two-dithering","value":[200.0,false]}"#);

        let back: Filter = serde_json::from_str(r#"{"kind":"negative"}"#).unwrap();
        assert_eq!(back, Filter::Negative);
    }
}
