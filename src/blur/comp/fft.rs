//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Fast Fourier Transform functions.
//!

use num_complex::Complex64;
use num_traits::identities::{One, Zero};

/// Returns floor(log2(n)).
pub fn quick_log2(mut n: usize) -> usize
{
    if n == 0 {
        return 0;
    }

    let mut result = 0;
    while n > 0 {
        n >>= 1;
        result += 1;
    }

    result - 1
}

pub fn is_power_of_2(n: usize) -> bool {
    n.count_ones() == 1
}

/// Calculates twiddle factors for FFT input of `fft_size`.
pub fn calc_twiddle_factors(fft_size: usize, inverse: bool) -> Vec<Complex64> {
    let mut result = vec![Complex64::zero(); quick_log2(fft_size) as usize + 1];

    let mut denominator = fft_size;
    for n in (0..=quick_log2(fft_size)).rev() {
        result[n as usize] = if inverse {
            (2.0 * std::f64::consts::PI * Complex64::i() / denominator as f64).exp()
        } else {
            (-2.0 * std::f64::consts::PI * Complex64::i() / denominator as f64).exp()
        };
        denominator >>= 1;
    }

    result
}

/// Calculates 1-dimensional discrete Fourier transform or its inverse (not normalized by `input`'s
/// length, the caller must do this).
///
/// # Parameters
///
/// * `n` - Number of values to calculate (must be a power of 2).
/// * `input` - Input values; at least `n` elements (taking `i_step` into account).
/// * `output` - Output values; at least `n` elements (taking `o_step` into account).
/// * `i_step` - Input step; external callers must specify 1.
/// * `o_step` - Output step; external callers must specify 1.
/// * `twiddles` - Last element is the twiddle factor corresponding to input's length `n`,
///     i.e. exp(-2*π*i / n) (or exp(2*π*i / n) for inverse transform). Second-to-last element
///     must be the next lower twiddle factor, i.e. exp(±2*π*i / (n/2)).
///
pub fn fft_1d<T: Copy + Into<Complex64>>(
    n: usize,
    input: &[T],
    output: &mut [Complex64],
    i_step: usize,
    o_step: usize,
    twiddles: &[Complex64]
) {
    if n == 1 {
        output[0] = input[0].into();
    } else {
        fft_1d(
            n / 2,
            input,
            output,
            2 * i_step,
            o_step,
            &twiddles[..twiddles.len() - 1]
        );

        fft_1d(
            n / 2,
            &input[i_step..],
            &mut output[n / 2 * o_step..],
            2 * i_step,
            o_step,
            &twiddles[..twiddles.len() - 1]
        );

        // initial twiddle factor
        let t_factor_0 = twiddles.last().unwrap();

        let mut t_factor = Complex64::one();

        for k in 0..n / 2 {
            let t = output[k * o_step];
            let h = t_factor * output[(k + n / 2) * o_step];

            output[k * o_step] = t + h;
            output[(k + n / 2) * o_step] = t - h;

            t_factor *= t_factor_0; // in effect, t_factor = exp(-2*π*i * k/n)
        }
    }
}

/// Calculates the discrete Fourier transform of `input`, whose length must be a power of 2.
pub fn fft<T: Copy + Into<Complex64>>(input: &[T]) -> Vec<Complex64> {
    assert!(is_power_of_2(input.len()));

    let twiddles = calc_twiddle_factors(input.len(), false);
    let mut output = vec![Complex64::zero(); input.len()];
    fft_1d(input.len(), input, &mut output, 1, 1, &twiddles);

    output
}

/// Calculates the inverse discrete Fourier transform of `input` (length must be a power of 2),
/// normalized by the input's length.
pub fn fft_inverse(input: &[Complex64]) -> Vec<Complex64> {
    assert!(is_power_of_2(input.len()));

    let twiddles = calc_twiddle_factors(input.len(), true);
    let mut output = vec![Complex64::zero(); input.len()];
    fft_1d(input.len(), input, &mut output, 1, 1, &twiddles);

    for c in &mut output {
        *c /= input.len() as f64;
    }

    output
}
