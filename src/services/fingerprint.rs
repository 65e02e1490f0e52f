use std::f64::consts::PI;
use std::fmt;

use image::imageops::{self, FilterType};
use image::DynamicImage;

/// Side length of the greyscale downsample the hash is computed from.
const SAMPLE_SIZE: usize = 32;

/// Side length of the low-frequency DCT block kept for the hash.
const BLOCK_SIZE: usize = 8;

/// 64-bit perceptual hash of decoded image content.
///
/// Visually similar images tend to collide; the system uses this only as a
/// cache key, never as an identity guarantee. `Display` renders the 16-digit
/// hex form used in store keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute the perceptual hash (pHash) of an image.
///
/// Deterministic pure function of the decoded pixels: greyscale, downsample
/// to 32x32, 2D DCT-II, keep the top-left 8x8 low-frequency block, and set
/// one bit per coefficient above the block median.
pub fn phash(image: &DynamicImage) -> Fingerprint {
    let small = imageops::resize(
        &image.to_luma8(),
        SAMPLE_SIZE as u32,
        SAMPLE_SIZE as u32,
        FilterType::Triangle,
    );

    let mut pixels = [[0.0f64; SAMPLE_SIZE]; SAMPLE_SIZE];
    for (x, y, pixel) in small.enumerate_pixels() {
        pixels[y as usize][x as usize] = f64::from(pixel.0[0]);
    }

    let freq = dct_2d(&pixels);

    let mut block = [0.0f64; BLOCK_SIZE * BLOCK_SIZE];
    for (row, coefficients) in freq.iter().take(BLOCK_SIZE).enumerate() {
        block[row * BLOCK_SIZE..(row + 1) * BLOCK_SIZE]
            .copy_from_slice(&coefficients[..BLOCK_SIZE]);
    }

    let median = median(&block);
    let mut bits = 0u64;
    for (i, &coefficient) in block.iter().enumerate() {
        if coefficient > median {
            bits |= 1 << i;
        }
    }

    Fingerprint(bits)
}

/// Unnormalized DCT-II along one dimension.
fn dct_1d(input: &[f64; SAMPLE_SIZE]) -> [f64; SAMPLE_SIZE] {
    let n = SAMPLE_SIZE as f64;
    let mut output = [0.0f64; SAMPLE_SIZE];
    for (k, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, &value) in input.iter().enumerate() {
            sum += value * (PI / n * (i as f64 + 0.5) * k as f64).cos();
        }
        *out = sum;
    }
    output
}

/// Separable 2D DCT-II: rows first, then columns.
fn dct_2d(pixels: &[[f64; SAMPLE_SIZE]; SAMPLE_SIZE]) -> [[f64; SAMPLE_SIZE]; SAMPLE_SIZE] {
    let mut rows = [[0.0f64; SAMPLE_SIZE]; SAMPLE_SIZE];
    for (row, pixel_row) in pixels.iter().enumerate() {
        rows[row] = dct_1d(pixel_row);
    }

    let mut output = [[0.0f64; SAMPLE_SIZE]; SAMPLE_SIZE];
    for col in 0..SAMPLE_SIZE {
        let mut column = [0.0f64; SAMPLE_SIZE];
        for row in 0..SAMPLE_SIZE {
            column[row] = rows[row][col];
        }
        let transformed = dct_1d(&column);
        for row in 0..SAMPLE_SIZE {
            output[row][col] = transformed[row];
        }
    }
    output
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    (sorted[mid - 1] + sorted[mid]) / 2.0
}
