//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Transform driver: validated parameters, image adapter and error reporting.
//!

use crate::image::{Image, PixelFormat};

pub mod comp;

pub use comp::{Normalization, OffsetMode};

/// Forward transform strategy. Both produce numerically consistent results for
/// collision-free tap sets; `Spectral` is O(N log N) and the default.
#[derive(Copy, Clone, Debug, strum_macros::EnumIter, PartialEq)]
pub enum Method {
    Direct,
    Spectral
}

#[derive(Debug)]
pub enum BlurError {
    InvalidTapCount(usize),
    InvalidSize(u32),
    ShapeMismatch{ expected: (u32, u32), actual: (u32, u32) },
    SingularKernel{ bin: usize, magnitude: f64 }
}

impl std::fmt::Display for BlurError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BlurError::InvalidTapCount(count) =>
                write!(f, "invalid tap count: {} (must be positive)", count),

            BlurError::InvalidSize(size) =>
                write!(f, "invalid transform size: {} (must be a positive power of 2)", size),

            BlurError::ShapeMismatch{ expected, actual } =>
                write!(f, "image is {}x{}, but the transform expects {}x{}",
                    actual.0, actual.1, expected.0, expected.1),

            BlurError::SingularKernel{ bin, magnitude } =>
                write!(f, "kernel is singular: frequency bin {} has magnitude {:.3e}",
                    bin, magnitude)
        }
    }
}

/// Immutable transform configuration; `new` validates, so every instance a transform sees
/// is usable. The same parameter values must be used for an encode and the decode meant
/// to invert it.
#[derive(Copy, Clone, Debug)]
pub struct BlurParams {
    size: u32,
    tap_count: usize,
    offset_mode: OffsetMode,
    normalization: Normalization
}

impl BlurParams {
    pub fn new(
        size: u32,
        tap_count: usize,
        offset_mode: OffsetMode,
        normalization: Normalization
    ) -> Result<BlurParams, BlurError> {
        if tap_count == 0 {
            return Err(BlurError::InvalidTapCount(tap_count));
        }
        // the spectral path uses a radix-2 FFT over size² samples
        if size == 0 || !comp::fft::is_power_of_2(size as usize) {
            return Err(BlurError::InvalidSize(size));
        }

        Ok(BlurParams{ size, tap_count, offset_mode, normalization })
    }

    pub fn size(&self) -> u32 { self.size }
    pub fn tap_count(&self) -> usize { self.tap_count }
    pub fn offset_mode(&self) -> OffsetMode { self.offset_mode }
    pub fn normalization(&self) -> Normalization { self.normalization }

    fn check_shape(&self, image: &Image) -> Result<(), BlurError> {
        if image.width() != self.size || image.height() != self.size {
            return Err(BlurError::ShapeMismatch{
                expected: (self.size, self.size),
                actual: (image.width(), image.height())
            });
        }
        Ok(())
    }
}

/// Flattens a `Mono32f` image into a row-major grid of f64 samples. No value transformation
/// beyond the numeric conversion.
pub fn grid_from_image(image: &Image) -> Vec<f64> {
    assert!(image.pixel_format() == PixelFormat::Mono32f);

    let mut grid = Vec::with_capacity(image.width() as usize * image.height() as usize);
    for y in 0..image.height() {
        grid.extend(image.line::<f32>(y).iter().map(|v| *v as f64));
    }

    grid
}

/// Reassembles a row-major grid into a `Mono32f` image.
pub fn image_from_grid(grid: &[f64], width: u32, height: u32) -> Image {
    assert!(grid.len() == width as usize * height as usize);

    let mut image = Image::new(width, height, None, PixelFormat::Mono32f, None, false);
    for y in 0..height {
        let line = image.line_mut::<f32>(y);
        for (dest, src) in line.iter_mut().zip(grid[y as usize * width as usize..].iter()) {
            *dest = *src as f32;
        }
    }

    image
}

/// Blurs `image` (must be `Mono32f` and `size`×`size`).
pub fn encode_image(image: &Image, params: &BlurParams, method: Method) -> Result<Image, BlurError> {
    params.check_shape(image)?;

    let grid = grid_from_image(image);
    let result = match method {
        Method::Direct => comp::encode_direct(
            &grid,
            params.size(),
            params.tap_count(),
            params.offset_mode(),
            params.normalization()
        ),
        Method::Spectral => comp::encode_spectral(
            &grid,
            &comp::build_kernel(params.size(), params.tap_count(), params.normalization())
        )
    };

    Ok(image_from_grid(&result, image.width(), image.height()))
}

/// Undoes `encode_image` performed with the same parameters. Reports a singular kernel as
/// an error instead of emitting non-finite samples.
pub fn decode_image(image: &Image, params: &BlurParams) -> Result<Image, BlurError> {
    params.check_shape(image)?;

    let grid = grid_from_image(image);
    let kernel = comp::build_kernel(params.size(), params.tap_count(), params.normalization());

    let result = comp::decode_spectral(&grid, &kernel)
        .map_err(|e| BlurError::SingularKernel{ bin: e.bin, magnitude: e.magnitude })?;

    Ok(image_from_grid(&result, image.width(), image.height()))
}

/// Kernel diagnostics for `--mode check`.
pub struct KernelDiagnostics {
    /// Number of distinct cells the taps landed on (collisions shrink this below the tap count).
    pub nonzero_taps: usize,
    /// Degree of gcd(kernel polynomial, x^N - 1); 0 means invertible.
    pub gcd_degree: usize,
    pub min_bin: usize,
    pub min_magnitude: f64
}

impl KernelDiagnostics {
    pub fn invertible(&self) -> bool { self.gcd_degree == 0 }
}

/// Builds the kernel for `params` and examines it both ways: exact polynomial GCD and the
/// minimum DFT bin magnitude the decode would divide by. The GCD is exact but expensive for
/// large sizes; this is an explicit diagnostic, decode does not run it.
pub fn check_kernel(params: &BlurParams) -> KernelDiagnostics {
    let kernel = comp::build_kernel(params.size(), params.tap_count(), params.normalization());
    let (min_bin, min_magnitude) = comp::min_spectrum_magnitude(&kernel);

    KernelDiagnostics{
        nonzero_taps: kernel.iter().filter(|v| **v != 0.0).count(),
        gcd_degree: comp::poly::gcd_degree(&kernel),
        min_bin,
        min_magnitude
    }
}
