//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Encode → PNG / TIFF | `image::DynamicImage::write_to` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Dither | [`dither`](super::dither) |
//! | Resample | [`resample`](super::resample) |
//! | Adjust | [`adjust`](super::adjust) |

use super::adjust::adjust;
use super::backend::{BackendError, ImageBackend};
use super::dither::dither;
use super::params::{Adjustment, DitherParams, IntegerSize, OutputFormat, SaveParams};
use super::resample::resample;
use super::scale::ScaleMode;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;
use std::sync::LazyLock;

const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True if `path` has one of the [`supported_input_extensions`].
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_error(context: &str, path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        other => BackendError::ProcessingFailed(format!(
            "{} {}: {}",
            context,
            path.display(),
            other
        )),
    }
}

fn encode(image: &DynamicImage, params: &SaveParams) -> Result<(), BackendError> {
    let file = std::fs::File::create(&params.output)?;
    let mut writer = BufWriter::new(file);
    let result = match params.format {
        OutputFormat::Png => image.write_to(&mut writer, ImageFormat::Png),
        OutputFormat::Tiff => image.write_to(&mut writer, ImageFormat::Tiff),
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut writer,
                params.quality.value() as u8,
            );
            rgb.write_with_encoder(encoder)
        }
        OutputFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut writer);
            rgba.write_with_encoder(encoder)
        }
    };
    result.map_err(|e| image_error("Failed to encode", &params.output, e))
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| image_error("Failed to decode", path, e))
    }

    fn save(&self, image: &DynamicImage, params: &SaveParams) -> Result<(), BackendError> {
        encode(image, params)
    }

    fn dither(
        &self,
        image: &DynamicImage,
        params: &DitherParams,
    ) -> Result<DynamicImage, BackendError> {
        Ok(dither(image, params))
    }

    fn resample(
        &self,
        image: &DynamicImage,
        size: IntegerSize,
        mode: ScaleMode,
    ) -> Result<DynamicImage, BackendError> {
        resample(image, size.width, size.height, mode)
    }

    fn adjust(
        &self,
        image: &DynamicImage,
        adjustment: &Adjustment,
    ) -> Result<DynamicImage, BackendError> {
        Ok(adjust(image, adjustment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(12, 8, |x, y| {
            Rgb([(x * 20) as u8, (y * 30) as u8, 128])
        }))
    }

    #[test]
    fn png_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        let backend = RustBackend::new();

        backend
            .save(
                &sample(),
                &SaveParams {
                    output: path.clone(),
                    format: OutputFormat::Png,
                    quality: Quality::default(),
                },
            )
            .unwrap();

        let loaded = backend.load(&path).unwrap();
        assert_eq!(loaded.to_rgb8().as_raw(), sample().to_rgb8().as_raw());
    }

    #[test]
    fn jpeg_save_keeps_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.jpg");
        let backend = RustBackend::new();

        backend
            .save(
                &sample(),
                &SaveParams {
                    output: path.clone(),
                    format: OutputFormat::Jpeg,
                    quality: Quality::new(80),
                },
            )
            .unwrap();

        let loaded = backend.load(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (12, 8));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let backend = RustBackend::new();
        let err = backend.load(Path::new("/nonexistent/photo.png")).unwrap_err();
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn load_garbage_is_processing_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = RustBackend::new().load(&path).unwrap_err();
        assert!(matches!(err, BackendError::ProcessingFailed(_)));
    }

    #[test]
    fn supported_extensions_match_case_insensitively() {
        assert!(is_supported(Path::new("a/B.JPG")));
        assert!(is_supported(Path::new("x.webp")));
        assert!(!is_supported(Path::new("x.txt")));
    }

    #[test]
    fn resample_goes_through_kernels() {
        let out = RustBackend::new()
            .resample(&sample(), IntegerSize::new(6, 4), ScaleMode::Lanczos)
            .unwrap();
        assert_eq!((out.width(), out.height()), (6, 4));
    }
}
