//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Computations module: tap generation, kernel construction, forward and inverse transforms.
//!

use cgmath::Vector2;
use num_complex::Complex64;
use rayon::prelude::*;

pub mod fft;
pub mod poly;

/// Recurrence seeds. Both sides of a blur (encode and decode) must use the same pair;
/// changing them changes every kernel this tool can produce.
pub const SEED_DI: u64 = 1337;
pub const SEED_DJ: u64 = 42;

/// A kernel DFT bin below this magnitude makes the spectral division unusable.
pub const SINGULARITY_EPSILON: f64 = 1.0e-9;

/// How tap positions are obtained during the direct-form transform.
#[derive(Copy, Clone, Debug, strum_macros::EnumIter, PartialEq)]
pub enum OffsetMode {
    /// Taps are generated once and applied relative to each cell.
    Relative,
    /// Absolute tap positions are regenerated from each swept base cell.
    AbsoluteSweep
}

#[derive(Copy, Clone, Debug, strum_macros::EnumIter, PartialEq)]
pub enum Normalization {
    /// Tap weights are 1/count; a collision-free kernel sums to 1.
    UnitSum,
    /// Tap weights are 1.
    Unnormalized
}

impl Normalization {
    pub fn weight(&self, count: usize) -> f64 {
        match self {
            Normalization::UnitSum => 1.0 / count as f64,
            Normalization::Unnormalized => 1.0
        }
    }
}

/// Returns `count` tap coordinates in [0, size)², derived from the quadratic recurrence
///
/// ```text
/// di' = (di² + dj) mod size
/// dj' = (dj² + di) mod size
/// ```
///
/// seeded with (`SEED_DI`, `SEED_DJ`). Deterministic: the same (size, count) always yields
/// the same sequence.
pub fn generate_offsets(size: u32, count: usize) -> Vec<Vector2<u32>> {
    generate_offsets_from(size, count, Vector2{ x: 0, y: 0 })
}

/// The swept-base variant of `generate_offsets`: returns absolute tap positions for the cell
/// at `base`. Horizontal wrap-around of `base.x + di` carries into the row coordinate.
///
/// With `base` = (0, 0) this reduces to the plain tap sequence.
pub fn generate_offsets_from(size: u32, count: usize, base: Vector2<u32>) -> Vec<Vector2<u32>> {
    assert!(size > 0);
    assert!(base.x < size && base.y < size);

    let m = size as u64;
    let mut result = Vec::with_capacity(count);

    let mut di = SEED_DI;
    let mut dj = SEED_DJ;
    for _ in 0..count {
        let next_di = (di * di + dj) % m;
        let next_dj = (dj * dj + di) % m;
        di = next_di;
        dj = next_dj;

        let shifted = base.x as u64 + di;
        result.push(Vector2{
            x: (shifted % m) as u32,
            y: ((base.y as u64 + dj + shifted / m) % m) as u32
        });
    }

    result
}

/// Builds the circulant-generator vector (length size²) whose circular convolution with a
/// flattened grid equals the direct-form transform of `generate_offsets(size, count)`.
pub fn build_kernel(size: u32, count: usize, normalization: Normalization) -> Vec<f64> {
    assert!(count > 0);

    kernel_from_taps(size, &generate_offsets(size, count), normalization.weight(count))
}

/// Builds a kernel vector from explicit tap positions, each weighted `weight`.
///
/// A tap produced twice overwrites its previous write; duplicates collapse to one entry
/// (intended, see `build_kernel` callers' collision tests).
pub fn kernel_from_taps(size: u32, taps: &[Vector2<u32>], weight: f64) -> Vec<f64> {
    assert!(size > 0);

    let mut kernel = vec![0.0; (size as usize).pow(2)];
    for tap in taps {
        kernel[(tap.x + tap.y * size) as usize] = weight;
    }

    // Alignment with the correlation computed by the direct form: the first element moves
    // to the back, then the whole sequence is reversed. Skipping this desynchronizes
    // encode and decode.
    kernel.rotate_left(1);
    kernel.reverse();

    kernel
}

/// Source sample index for a tap applied relative to cell (x, y); horizontal wrap-around
/// carries into the row index, making the flattened 2-D gather a circular correlation of
/// length size².
fn wrapped_index(size: u32, x: u32, y: u32, tap: &Vector2<u32>) -> usize {
    let m = size as u64;
    let s = x as u64 + tap.x as u64;
    (s % m + (y as u64 + tap.y as u64 + s / m) % m * m) as usize
}

/// Direct-form forward transform: each output cell is the weighted sum of the input samples
/// at the tap positions; O(size² · count). Rows are independent and processed in parallel.
pub fn encode_direct(
    grid: &[f64],
    size: u32,
    count: usize,
    offset_mode: OffsetMode,
    normalization: Normalization
) -> Vec<f64> {
    assert!(size > 0 && count > 0);
    assert!(grid.len() == (size as usize).pow(2));

    let weight = normalization.weight(count);
    let taps = generate_offsets(size, count);

    let mut result = vec![0.0; grid.len()];
    result.par_chunks_mut(size as usize).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut value = 0.0;
            match offset_mode {
                OffsetMode::Relative => {
                    for tap in &taps {
                        value += grid[wrapped_index(size, x as u32, y as u32, tap)];
                    }
                },
                OffsetMode::AbsoluteSweep => {
                    let base = Vector2{ x: x as u32, y: y as u32 };
                    for pos in &generate_offsets_from(size, count, base) {
                        value += grid[(pos.x + pos.y * size) as usize];
                    }
                }
            }
            *out = value * weight;
        }
    });

    result
}

/// Spectral forward transform: circular convolution of the flattened grid with `kernel`
/// via FFT multiplication; O(N log N). Both slices must have the same power-of-2 length.
pub fn encode_spectral(grid: &[f64], kernel: &[f64]) -> Vec<f64> {
    assert!(grid.len() == kernel.len());

    let grid_fft = fft::fft(grid);
    let kernel_fft = fft::fft(kernel);

    let product: Vec<Complex64> = grid_fft.iter().zip(kernel_fft.iter())
        .map(|(g, k)| g * k)
        .collect();

    fft::fft_inverse(&product).iter().map(|c| c.re).collect()
}

/// The kernel's circulant operator cannot be inverted: some DFT bin of the kernel is
/// (near-)zero and the spectral division would blow up there.
#[derive(Debug)]
pub struct SingularKernel {
    pub bin: usize,
    pub magnitude: f64
}

/// Spectral inverse transform: divides the flattened grid by `kernel` elementwise in the
/// frequency domain. Refuses to divide when any kernel bin's magnitude falls below
/// `SINGULARITY_EPSILON`; no NaN/infinity samples are ever produced.
pub fn decode_spectral(grid: &[f64], kernel: &[f64]) -> Result<Vec<f64>, SingularKernel> {
    assert!(grid.len() == kernel.len());

    let kernel_fft = fft::fft(kernel);
    let (bin, magnitude) = min_magnitude(&kernel_fft);
    if magnitude < SINGULARITY_EPSILON {
        return Err(SingularKernel{ bin, magnitude });
    }

    let grid_fft = fft::fft(grid);
    let quotient: Vec<Complex64> = grid_fft.iter().zip(kernel_fft.iter())
        .map(|(g, k)| g / k)
        .collect();

    Ok(fft::fft_inverse(&quotient).iter().map(|c| c.re).collect())
}

/// Returns (bin index, magnitude) of the smallest-magnitude DFT bin of `kernel`.
pub fn min_spectrum_magnitude(kernel: &[f64]) -> (usize, f64) {
    min_magnitude(&fft::fft(kernel))
}

fn min_magnitude(spectrum: &[Complex64]) -> (usize, f64) {
    spectrum.iter().enumerate()
        .map(|(i, c)| (i, c.norm()))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, irregular sample values.
    fn test_grid(size: u32) -> Vec<f64> {
        (0..(size as u64).pow(2)).map(|i| (i * 2654435761 % 255) as f64).collect()
    }

    fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn given_same_parameters_offsets_repeat_exactly() {
        assert_eq!(generate_offsets(16, 32), generate_offsets(16, 32));
    }

    #[test]
    fn given_zero_count_offsets_are_empty() {
        assert!(generate_offsets(8, 0).is_empty());
    }

    #[test]
    fn given_size_4_and_2_taps_offsets_match_hand_computation() {
        // di = (1337² + 42) mod 4 = 3, dj = (42² + 1337) mod 4 = 1, then
        // di = (3² + 1) mod 4 = 2, dj = (1² + 3) mod 4 = 0
        assert_eq!(
            vec![Vector2{ x: 3, y: 1 }, Vector2{ x: 2, y: 0 }],
            generate_offsets(4, 2)
        );
    }

    #[test]
    fn given_size_1_all_offsets_are_origin() {
        let taps = generate_offsets(1, 3);
        assert_eq!(vec![Vector2{ x: 0, y: 0 }; 3], taps);
    }

    #[test]
    fn kernel_length_is_size_squared() {
        assert_eq!(64, build_kernel(8, 4, Normalization::UnitSum).len());
        assert_eq!(1, build_kernel(1, 1, Normalization::UnitSum).len());
    }

    #[test]
    fn given_size_4_and_2_taps_kernel_nonzeros_sit_at_expected_positions() {
        // taps (3, 1) and (2, 0) flatten to 7 and 2; the rotate-and-reverse alignment
        // sends index i to (-i) mod 16, so the weights land at 9 and 14
        let kernel = build_kernel(4, 2, Normalization::UnitSum);

        for (i, value) in kernel.iter().enumerate() {
            let expected = if i == 9 || i == 14 { 0.5 } else { 0.0 };
            assert_eq!(expected, *value, "index {}", i);
        }
    }

    #[test]
    fn collision_free_unit_sum_kernel_sums_to_one() {
        // taps of (4, 2) are distinct
        let sum: f64 = build_kernel(4, 2, Normalization::UnitSum).iter().sum();
        assert!((sum - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn given_tap_collision_kernel_sum_shrinks() {
        // size 2 yields taps (1, 1), (0, 0), (0, 0): the third overwrites the second
        let taps = generate_offsets(2, 3);
        assert_eq!(taps[1], taps[2]);

        let kernel = build_kernel(2, 3, Normalization::UnitSum);
        assert_eq!(2, kernel.iter().filter(|v| **v != 0.0).count());

        let sum: f64 = kernel.iter().sum();
        assert!((sum - 2.0 / 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn given_all_ones_grid_normalized_encode_returns_all_ones() {
        let grid = vec![1.0; 16];

        let direct = encode_direct(&grid, 4, 2, OffsetMode::Relative, Normalization::UnitSum);
        let spectral = encode_spectral(&grid, &build_kernel(4, 2, Normalization::UnitSum));

        for value in direct.iter().chain(spectral.iter()) {
            assert!((value - 1.0).abs() < 1.0e-12);
        }
    }

    #[test]
    fn direct_and_spectral_forms_agree() {
        // size 16 / count 4 produces no tap collisions, so the kernel carries
        // exactly the weights the direct form applies
        let grid = test_grid(16);
        let taps = generate_offsets(16, 4);
        assert_eq!(4, {
            let mut t = taps.clone();
            t.sort_by_key(|v| (v.x, v.y));
            t.dedup();
            t.len()
        });

        let direct = encode_direct(&grid, 16, 4, OffsetMode::Relative, Normalization::UnitSum);
        let spectral = encode_spectral(&grid, &build_kernel(16, 4, Normalization::UnitSum));

        assert!(max_abs_diff(&direct, &spectral) < 1.0e-9);
    }

    #[test]
    fn relative_and_swept_offset_modes_agree() {
        let grid = test_grid(8);

        let relative = encode_direct(&grid, 8, 4, OffsetMode::Relative, Normalization::UnitSum);
        let swept = encode_direct(&grid, 8, 4, OffsetMode::AbsoluteSweep, Normalization::UnitSum);

        assert_eq!(relative, swept);
    }

    #[test]
    fn unnormalized_encode_is_scaled_normalized_encode() {
        let grid = test_grid(8);

        let normalized = encode_direct(&grid, 8, 4, OffsetMode::Relative, Normalization::UnitSum);
        let raw = encode_direct(&grid, 8, 4, OffsetMode::Relative, Normalization::Unnormalized);

        let scaled: Vec<f64> = normalized.iter().map(|v| v * 4.0).collect();
        assert!(max_abs_diff(&raw, &scaled) < 1.0e-9);
    }

    #[test]
    fn decode_undoes_spectral_encode() {
        let grid = test_grid(8);
        let kernel = build_kernel(8, 4, Normalization::UnitSum);

        let encoded = encode_spectral(&grid, &kernel);
        let decoded = decode_spectral(&encoded, &kernel).unwrap();

        assert!(max_abs_diff(&grid, &decoded) < 1.0e-6);
    }

    #[test]
    fn decode_undoes_unnormalized_encode_too() {
        let grid = test_grid(8);
        let kernel = build_kernel(8, 4, Normalization::Unnormalized);

        let encoded = encode_spectral(&grid, &kernel);
        let decoded = decode_spectral(&encoded, &kernel).unwrap();

        assert!(max_abs_diff(&grid, &decoded) < 1.0e-6);
    }

    #[test]
    fn given_1x1_grid_round_trip_is_identity() {
        let kernel = build_kernel(1, 1, Normalization::UnitSum);
        let decoded = decode_spectral(&encode_spectral(&[7.5], &kernel), &kernel).unwrap();
        assert!((decoded[0] - 7.5).abs() < 1.0e-12);
    }

    #[test]
    fn given_singular_kernel_decode_reports_the_dead_bin() {
        // two equal taps whose flat indices differ by N/2 = 32: f(x) is divisible
        // by x^32 + 1 and half the spectrum vanishes
        let taps = [Vector2{ x: 0, y: 0 }, Vector2{ x: 0, y: 4 }];
        let kernel = kernel_from_taps(8, &taps, 0.5);
        assert!(!poly::is_invertible(&kernel));

        let grid = test_grid(8);
        match decode_spectral(&grid, &kernel) {
            Err(SingularKernel{ magnitude, .. }) => assert!(magnitude < SINGULARITY_EPSILON),
            Ok(_) => panic!("Expected a singular kernel report.")
        }
    }

    #[test]
    fn given_zero_kernel_decode_refuses() {
        let kernel = kernel_from_taps(4, &[], 1.0);
        assert!(decode_spectral(&test_grid(4), &kernel).is_err());
    }

    #[test]
    fn gcd_and_spectrum_views_of_invertibility_agree() {
        let tap_sets: Vec<Vec<Vector2<u32>>> = vec![
            // a lone spike: invertible (pure cyclic shift)
            vec![Vector2{ x: 0, y: 0 }],
            // any two equal taps at distance d satisfy 1 + ζ^d = 0 at some 16th root
            // of unity, so every 2-tap kernel here is singular
            vec![Vector2{ x: 3, y: 1 }, Vector2{ x: 2, y: 0 }],
            vec![Vector2{ x: 0, y: 0 }, Vector2{ x: 2, y: 0 }],
            vec![Vector2{ x: 0, y: 0 }, Vector2{ x: 0, y: 2 }],
            // 1 + x^5 + x^10 needs an order-3 root of unity, which N = 16 lacks: invertible
            vec![Vector2{ x: 0, y: 0 }, Vector2{ x: 1, y: 1 }, Vector2{ x: 2, y: 2 }],
        ];

        for taps in tap_sets {
            let kernel = kernel_from_taps(4, &taps, 1.0 / taps.len() as f64);
            let (_, magnitude) = min_spectrum_magnitude(&kernel);
            assert_eq!(
                magnitude >= SINGULARITY_EPSILON,
                poly::is_invertible(&kernel),
                "taps {:?}: min bin magnitude = {}", taps, magnitude
            );
        }
    }
}
