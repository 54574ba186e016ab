//! Ordered and error-diffusion dithering.
//!
//! Every method reduces each channel to pure black or white around a cut
//! level. `threshold` is the mean cut level on the 0–255 scale:
//!
//! - **Ordered (Bayer)**: the matrix spreads per-pixel cut levels evenly over
//!   `0..2 * threshold`, so 128 gives classic Bayer dithering and higher
//!   values darken the result.
//! - **Error diffusion**: pixels at or above `threshold` become white, and the
//!   quantisation error is pushed to unvisited neighbours.
//!
//! With `grayscale` the image is reduced to luma first and the same bit is
//! written to all three colour channels. Without it R, G and B are dithered
//! independently. Alpha is never touched.

use super::adjust::luma;
use super::params::DitherParams;
use super::resample::restore_color;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitheringType {
    BayerTwo,
    BayerThree,
    BayerFour,
    BayerEight,
    FloydSteinberg,
    Atkinson,
    SierraLite,
}

impl DitheringType {
    pub const ALL: [DitheringType; 7] = [
        DitheringType::BayerTwo,
        DitheringType::BayerThree,
        DitheringType::BayerFour,
        DitheringType::BayerEight,
        DitheringType::FloydSteinberg,
        DitheringType::Atkinson,
        DitheringType::SierraLite,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DitheringType::BayerTwo => "bayer-two",
            DitheringType::BayerThree => "bayer-three",
            DitheringType::BayerFour => "bayer-four",
            DitheringType::BayerEight => "bayer-eight",
            DitheringType::FloydSteinberg => "floyd-steinberg",
            DitheringType::Atkinson => "atkinson",
            DitheringType::SierraLite => "sierra-lite",
        }
    }
}

impl fmt::Display for DitheringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dither `image` according to `params`. The colour type is preserved.
pub fn dither(image: &DynamicImage, params: &DitherParams) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    let cut = params.threshold.clamp(0, 255) as f32;

    if params.grayscale {
        let (w, h) = rgba.dimensions();
        let mut luma: Vec<f32> = rgba
            .pixels()
            .map(|p| luma([p.0[0] as f32, p.0[1] as f32, p.0[2] as f32]))
            .collect();
        dither_plane(&mut luma, w as usize, h as usize, params.kind, cut);
        for (p, v) in rgba.pixels_mut().zip(luma) {
            let v = v as u8;
            p.0[0] = v;
            p.0[1] = v;
            p.0[2] = v;
        }
    } else {
        for channel in 0..3 {
            dither_channel(&mut rgba, channel, params.kind, cut);
        }
    }

    restore_color(DynamicImage::ImageRgba8(rgba), image.color())
}

fn dither_channel(image: &mut RgbaImage, channel: usize, kind: DitheringType, cut: f32) {
    let (w, h) = image.dimensions();
    let mut plane: Vec<f32> = image.pixels().map(|p| p.0[channel] as f32).collect();
    dither_plane(&mut plane, w as usize, h as usize, kind, cut);
    for (p, v) in image.pixels_mut().zip(plane) {
        p.0[channel] = v as u8;
    }
}

/// Quantise a single plane in place to 0.0 / 255.0.
fn dither_plane(plane: &mut [f32], width: usize, height: usize, kind: DitheringType, cut: f32) {
    match kind {
        DitheringType::BayerTwo => ordered(plane, width, &bayer(2), 2, cut),
        DitheringType::BayerThree => ordered(plane, width, &BAYER_3, 3, cut),
        DitheringType::BayerFour => ordered(plane, width, &bayer(4), 4, cut),
        DitheringType::BayerEight => ordered(plane, width, &bayer(8), 8, cut),
        DitheringType::FloydSteinberg => diffuse(plane, width, height, FLOYD_STEINBERG, cut),
        DitheringType::Atkinson => diffuse(plane, width, height, ATKINSON, cut),
        DitheringType::SierraLite => diffuse(plane, width, height, SIERRA_LITE, cut),
    }
}

// ============================================================================
// Ordered dithering
// ============================================================================

const BAYER_3: [u32; 9] = [0, 7, 3, 6, 5, 2, 4, 1, 8];

/// Index matrix of size `n` x `n` (power of two), row-major.
///
/// Built recursively: `M(2n) = [[4M, 4M+2], [4M+3, 4M+1]]`.
fn bayer(n: usize) -> Vec<u32> {
    if n <= 1 {
        return vec![0];
    }
    let half = n / 2;
    let m = bayer(half);
    let mut out = vec![0u32; n * n];
    for y in 0..n {
        for x in 0..n {
            let base = 4 * m[(y % half) * half + (x % half)];
            let offset = match (x >= half, y >= half) {
                (false, false) => 0,
                (true, false) => 2,
                (false, true) => 3,
                (true, true) => 1,
            };
            out[y * n + x] = base + offset;
        }
    }
    out
}

fn ordered(plane: &mut [f32], width: usize, matrix: &[u32], n: usize, cut: f32) {
    let cells = (n * n) as f32;
    for (i, v) in plane.iter_mut().enumerate() {
        let (x, y) = (i % width, i / width);
        let rank = matrix[(y % n) * n + (x % n)] as f32;
        let level = 2.0 * cut * (rank + 0.5) / cells;
        *v = if *v > level { 255.0 } else { 0.0 };
    }
}

// ============================================================================
// Error diffusion
// ============================================================================

/// Neighbour offsets `(dx, dy)` with their share of the error.
type Diffusion = &'static [(isize, usize, f32)];

const FLOYD_STEINBERG: Diffusion = &[
    (1, 0, 7.0 / 16.0),
    (-1, 1, 3.0 / 16.0),
    (0, 1, 5.0 / 16.0),
    (1, 1, 1.0 / 16.0),
];

// Only 6/8 of the error is spread; the loss raises contrast
const ATKINSON: Diffusion = &[
    (1, 0, 1.0 / 8.0),
    (2, 0, 1.0 / 8.0),
    (-1, 1, 1.0 / 8.0),
    (0, 1, 1.0 / 8.0),
    (1, 1, 1.0 / 8.0),
    (0, 2, 1.0 / 8.0),
];

const SIERRA_LITE: Diffusion = &[(1, 0, 2.0 / 4.0), (-1, 1, 1.0 / 4.0), (0, 1, 1.0 / 4.0)];

fn diffuse(plane: &mut [f32], width: usize, height: usize, kernel: Diffusion, cut: f32) {
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = plane[idx].clamp(0.0, 255.0);
            let new = if old >= cut { 255.0 } else { 0.0 };
            plane[idx] = new;
            let err = old - new;

            for &(dx, dy, share) in kernel {
                let nx = x as isize + dx;
                let ny = y + dy;
                if nx < 0 || nx as usize >= width || ny >= height {
                    continue;
                }
                plane[ny * width + nx as usize] += err * share;
            }
        }
    }
}
