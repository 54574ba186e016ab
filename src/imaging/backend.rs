//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the boundary between filters and the code
//! that touches pixels. Filters only pick parameters and call one of the five
//! operations: load, save, dither, resample, adjust.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate plus this crate's own dithering and resampling kernels.

use super::params::{Adjustment, DitherParams, IntegerSize, SaveParams};
use super::scale::ScaleMode;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl BackendError {
    /// True when the failure was the OS refusing access to a path.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BackendError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all five operations so the rest of the
/// codebase is backend-agnostic. All operations except `save` are pure:
/// inputs are borrowed and a new image is returned.
pub trait ImageBackend: Sync {
    /// Decode an image from disk.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode and write an image.
    fn save(&self, image: &DynamicImage, params: &SaveParams) -> Result<(), BackendError>;

    /// Reduce to black/white per channel (or per luma).
    fn dither(
        &self,
        image: &DynamicImage,
        params: &DitherParams,
    ) -> Result<DynamicImage, BackendError>;

    /// Resample to an exact size with the given strategy.
    fn resample(
        &self,
        image: &DynamicImage,
        size: IntegerSize,
        mode: ScaleMode,
    ) -> Result<DynamicImage, BackendError>;

    /// Apply a tone or colour adjustment.
    fn adjust(
        &self,
        image: &DynamicImage,
        adjustment: &Adjustment,
    ) -> Result<DynamicImage, BackendError>;
}
