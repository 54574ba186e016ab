//! Separable kernel resampling, one kernel per [`ScaleMode`].
//!
//! Every mode except `Nearest` runs the same two passes (horizontal, then
//! vertical) over an RGBA `f32` working buffer. The only difference is the
//! kernel and its support radius:
//!
//! | Mode | Kernel | Support |
//! |---|---|---|
//! | Bilinear | triangle | 1 |
//! | Hermite | cubic B=0, C=0 | 2 |
//! | Spline | cubic B=1, C=0 | 2 |
//! | Mitchell | cubic B=1/3, C=1/3 | 2 |
//! | Catmull | cubic B=0, C=1/2 | 2 |
//! | Bicubic | cubic B=0, C=3/4 | 2 |
//! | Lanczos | Lanczos3 | 3 |
//! | Hann | Hann-windowed sinc | 3 |
//!
//! `Nearest` is a point sample. When shrinking, the support stretches by the
//! reduction factor so every source pixel contributes.
//!
//! Rows are processed in parallel with rayon.

use super::backend::BackendError;
use super::scale::ScaleMode;
use image::{ColorType, DynamicImage, Rgba32FImage};
use rayon::prelude::*;
use std::f32::consts::PI;

const CHANNELS: usize = 4;

/// Resample `image` to exactly `width` x `height`.
///
/// The output keeps the colour type of the input. Resampling to the current
/// size returns a copy.
pub fn resample(
    image: &DynamicImage,
    width: u32,
    height: u32,
    mode: ScaleMode,
) -> Result<DynamicImage, BackendError> {
    if width == 0 || height == 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "Cannot resample to {}x{}",
            width, height
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(BackendError::ProcessingFailed(
            "Cannot resample an empty image".into(),
        ));
    }
    if (image.width(), image.height()) == (width, height) {
        return Ok(image.clone());
    }

    let src = image.to_rgba32f();
    let mode = mode.resolve();
    let out = if mode == ScaleMode::Nearest {
        nearest(&src, width, height)
    } else {
        let kernel = Kernel::for_mode(mode);
        let horizontal = horizontal_pass(&src, width, &kernel);
        vertical_pass(&horizontal, height, &kernel)
    };

    Ok(restore_color(DynamicImage::ImageRgba32F(out), image.color()))
}

/// Convert the `f32` working image back to the caller's colour type.
pub(crate) fn restore_color(image: DynamicImage, like: ColorType) -> DynamicImage {
    match like {
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        ColorType::L16 => DynamicImage::ImageLuma16(image.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(image.to_rgb32f()),
        ColorType::Rgba32F => image,
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

// ============================================================================
// Kernels
// ============================================================================

struct Kernel {
    support: f32,
    eval: fn(f32) -> f32,
}

impl Kernel {
    fn for_mode(mode: ScaleMode) -> Self {
        match mode {
            ScaleMode::Hermite => Self::cubic(|x| bc_cubic(x, 0.0, 0.0)),
            ScaleMode::Spline => Self::cubic(|x| bc_cubic(x, 1.0, 0.0)),
            ScaleMode::Mitchell => Self::cubic(|x| bc_cubic(x, 1.0 / 3.0, 1.0 / 3.0)),
            ScaleMode::Catmull => Self::cubic(|x| bc_cubic(x, 0.0, 0.5)),
            ScaleMode::Bicubic => Self::cubic(|x| bc_cubic(x, 0.0, 0.75)),
            ScaleMode::Lanczos => Self {
                support: 3.0,
                eval: lanczos3,
            },
            ScaleMode::Hann => Self {
                support: 3.0,
                eval: hann3,
            },
            // Bilinear, plus anything resolve() already folded into it
            _ => Self {
                support: 1.0,
                eval: triangle,
            },
        }
    }

    fn cubic(eval: fn(f32) -> f32) -> Self {
        Self { support: 2.0, eval }
    }
}

fn triangle(x: f32) -> f32 {
    let x = x.abs();
    if x < 1.0 { 1.0 - x } else { 0.0 }
}

/// Mitchell-Netravali family of cubic filters.
fn bc_cubic(x: f32, b: f32, c: f32) -> f32 {
    let x = x.abs();
    let x2 = x * x;
    let x3 = x2 * x;
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x3 + (-18.0 + 12.0 * b + 6.0 * c) * x2 + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x3 + (6.0 * b + 30.0 * c) * x2 + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

fn sinc(x: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn lanczos3(x: f32) -> f32 {
    if x.abs() < 3.0 {
        sinc(x) * sinc(x / 3.0)
    } else {
        0.0
    }
}

fn hann3(x: f32) -> f32 {
    if x.abs() < 3.0 {
        sinc(x) * (0.5 + 0.5 * (PI * x / 3.0).cos())
    } else {
        0.0
    }
}

// ============================================================================
// Weights
// ============================================================================

/// Source span and normalised weights feeding one output sample.
struct Contribution {
    start: usize,
    weights: Vec<f32>,
}

fn contributions(src_len: u32, dst_len: u32, kernel: &Kernel) -> Vec<Contribution> {
    let ratio = src_len as f32 / dst_len as f32;
    let stretch = ratio.max(1.0);
    let support = kernel.support * stretch;

    (0..dst_len)
        .map(|out| {
            let center = (out as f32 + 0.5) * ratio;
            let left = ((center - support).floor().max(0.0)) as usize;
            let right = ((center + support).ceil() as usize).min(src_len as usize);

            let mut weights: Vec<f32> = (left..right)
                .map(|i| (kernel.eval)((i as f32 + 0.5 - center) / stretch))
                .collect();
            let sum: f32 = weights.iter().sum();

            if sum.abs() > f32::EPSILON {
                for w in &mut weights {
                    *w /= sum;
                }
                Contribution {
                    start: left,
                    weights,
                }
            } else {
                // Degenerate span: fall back to the closest source sample
                let nearest = (center.floor() as usize).min(src_len as usize - 1);
                Contribution {
                    start: nearest,
                    weights: vec![1.0],
                }
            }
        })
        .collect()
}

// ============================================================================
// Passes
// ============================================================================

fn horizontal_pass(src: &Rgba32FImage, width: u32, kernel: &Kernel) -> Rgba32FImage {
    let (src_w, src_h) = src.dimensions();
    let contribs = contributions(src_w, width, kernel);
    let src_raw = src.as_raw();
    let src_stride = src_w as usize * CHANNELS;
    let dst_stride = width as usize * CHANNELS;

    let mut out = vec![0.0f32; dst_stride * src_h as usize];
    out.par_chunks_mut(dst_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src_raw[y * src_stride..(y + 1) * src_stride];
            for (x, contrib) in contribs.iter().enumerate() {
                let mut acc = [0.0f32; CHANNELS];
                for (k, w) in contrib.weights.iter().enumerate() {
                    let base = (contrib.start + k) * CHANNELS;
                    for c in 0..CHANNELS {
                        acc[c] += src_row[base + c] * w;
                    }
                }
                row[x * CHANNELS..(x + 1) * CHANNELS].copy_from_slice(&acc);
            }
        });

    to_image(width, src_h, out)
}

fn vertical_pass(src: &Rgba32FImage, height: u32, kernel: &Kernel) -> Rgba32FImage {
    let (src_w, src_h) = src.dimensions();
    let contribs = contributions(src_h, height, kernel);
    let src_raw = src.as_raw();
    let stride = src_w as usize * CHANNELS;

    let mut out = vec![0.0f32; stride * height as usize];
    out.par_chunks_mut(stride)
        .zip(contribs.par_iter())
        .for_each(|(row, contrib)| {
            for (k, w) in contrib.weights.iter().enumerate() {
                let src_row = &src_raw[(contrib.start + k) * stride..(contrib.start + k + 1) * stride];
                for (dst, s) in row.iter_mut().zip(src_row) {
                    *dst += s * w;
                }
            }
        });

    to_image(src_w, height, out)
}

fn nearest(src: &Rgba32FImage, width: u32, height: u32) -> Rgba32FImage {
    let (src_w, src_h) = src.dimensions();
    let x_ratio = src_w as f32 / width as f32;
    let y_ratio = src_h as f32 / height as f32;

    Rgba32FImage::from_fn(width, height, |x, y| {
        let sx = (((x as f32 + 0.5) * x_ratio) as u32).min(src_w - 1);
        let sy = (((y as f32 + 0.5) * y_ratio) as u32).min(src_h - 1);
        *src.get_pixel(sx, sy)
    })
}

fn to_image(width: u32, height: u32, data: Vec<f32>) -> Rgba32FImage {
    // Buffer length is width * height * CHANNELS by construction
    Rgba32FImage::from_raw(width, height, data)
        .unwrap_or_else(|| Rgba32FImage::new(width, height))
}
