//! Per-pixel tone and colour operations.
//!
//! All point operations work on normalised `f32` RGB (0.0–1.0) and clamp the
//! result, so an out-of-range intermediate never leaks into the next filter
//! of a stack. Alpha is carried through unchanged.

use super::params::Adjustment;
use super::resample::restore_color;
use image::{DynamicImage, Rgba32FImage};
use rayon::prelude::*;

/// Rec. 709 luma weights, as `image` uses for `to_luma8`. Every luma in
/// the crate (saturation, grayscale, threshold, grayscale dithering) goes
/// through [`luma`].
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub fn adjust(image: &DynamicImage, adjustment: &Adjustment) -> DynamicImage {
    let out = match *adjustment {
        Adjustment::Brightness(offset) => map_rgb(image, |c| c.map(|v| v + offset)),
        Adjustment::Contrast(factor) => map_rgb(image, |c| c.map(|v| (v - 0.5) * factor + 0.5)),
        Adjustment::Gamma(gamma) => map_rgb(image, |c| c.map(|v| v.powf(gamma))),
        Adjustment::Exposure(ev) => {
            let gain = 2f32.powf(ev);
            map_rgb(image, |c| c.map(|v| v * gain))
        }
        Adjustment::Saturation(amount) => map_rgb(image, |c| {
            let l = luma(c);
            c.map(|v| l + (v - l) * amount)
        }),
        Adjustment::Grayscale => map_rgb(image, |c| [luma(c); 3]),
        Adjustment::Negative => map_rgb(image, |c| c.map(|v| 1.0 - v)),
        Adjustment::Sepia => map_rgb(image, sepia),
        Adjustment::Threshold(level) => {
            let cut = level / 255.0;
            map_rgb(image, |c| [if luma(c) >= cut { 1.0 } else { 0.0 }; 3])
        }
        Adjustment::Pixelate(block) => pixelate(&image.to_rgba32f(), block.max(1)),
    };
    restore_color(DynamicImage::ImageRgba32F(out), image.color())
}

/// Weighted sum of RGB; linear, so any channel scale works.
pub(super) fn luma(c: [f32; 3]) -> f32 {
    c[0] * LUMA[0] + c[1] * LUMA[1] + c[2] * LUMA[2]
}

fn sepia(c: [f32; 3]) -> [f32; 3] {
    [
        c[0] * 0.393 + c[1] * 0.769 + c[2] * 0.189,
        c[0] * 0.349 + c[1] * 0.686 + c[2] * 0.168,
        c[0] * 0.272 + c[1] * 0.534 + c[2] * 0.131,
    ]
}

fn map_rgb(image: &DynamicImage, f: impl Fn([f32; 3]) -> [f32; 3] + Sync) -> Rgba32FImage {
    let mut buf = image.to_rgba32f();
    buf.par_chunks_mut(4).for_each(|px| {
        let out = f([px[0], px[1], px[2]]);
        for (dst, v) in px.iter_mut().zip(out) {
            *dst = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
    });
    buf
}

/// Replace each `block` x `block` cell with its mean colour.
fn pixelate(src: &Rgba32FImage, block: u32) -> Rgba32FImage {
    let (w, h) = src.dimensions();
    let mut out = src.clone();

    for by in (0..h).step_by(block as usize) {
        for bx in (0..w).step_by(block as usize) {
            let x_end = (bx + block).min(w);
            let y_end = (by + block).min(h);
            let mut sum = [0.0f32; 4];
            for y in by..y_end {
                for x in bx..x_end {
                    for (s, v) in sum.iter_mut().zip(src.get_pixel(x, y).0) {
                        *s += v;
                    }
                }
            }
            let count = ((x_end - bx) * (y_end - by)) as f32;
            let mean = image::Rgba(sum.map(|s| s / count));
            for y in by..y_end {
                for x in bx..x_end {
                    out.put_pixel(x, y, mean);
                }
            }
        }
    }
    out
}
