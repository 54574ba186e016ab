//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Load / save** | `image` crate codecs |
//! | **Resample** | separable kernels, one per [`ScaleMode`] |
//! | **Dither** | Bayer 2/3/4/8, Floyd–Steinberg, Atkinson, Sierra Lite |
//! | **Adjust** | per-pixel tone/colour operations |
//!
//! The module is split into:
//! - **Scale modes**: [`ScaleMode`] catalog with stable integer codes
//! - **Parameters**: Data structures describing image operations
//! - **Kernels**: [`resample`], [`dither`], [`adjust`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod adjust;
pub mod backend;
pub mod dither;
mod params;
pub mod resample;
pub mod rust_backend;
pub mod scale;

pub use backend::{BackendError, ImageBackend};
pub use dither::DitheringType;
pub use params::{Adjustment, DitherParams, IntegerSize, OutputFormat, Quality, SaveParams};
pub use rust_backend::{RustBackend, is_supported, supported_input_extensions};
pub use scale::{ScaleMode, UnknownScaleMode};
