//
// cycloblur - Reversible circulant blur for images
// Copyright (c) 2026 cycloblur developers
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Exact polynomial arithmetic for the kernel invertibility check.
//!
//! The circulant operator generated by a kernel vector of length N is singular exactly when
//! the kernel's polynomial shares a root with x^N - 1 (i.e. some discrete Fourier transform
//! sample of the kernel is zero at an N-th root of unity). The check below computes
//! gcd(f, x^N - 1) over the rationals; a positive degree means "singular".
//!
//! This is a diagnostic, not a hot path: the polynomials have degree N = size², so the check
//! gets expensive for large images.
//!

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::identities::{One, Zero};

/// Polynomial coefficients in ascending order of powers, with no trailing zeros.
type Coeffs = Vec<BigRational>;

fn trim(p: &mut Coeffs) {
    while p.last().map_or(false, |c| c.is_zero()) {
        p.pop();
    }
}

fn make_monic(p: &mut Coeffs) {
    let lead = p.last().unwrap().clone();
    if !lead.is_one() {
        for c in p.iter_mut() {
            *c = &*c / &lead;
        }
    }
}

/// Remainder of `a` divided by `b`; `b` must be nonzero.
fn poly_rem(mut a: Coeffs, b: &Coeffs) -> Coeffs {
    assert!(!b.is_empty());

    while !a.is_empty() && a.len() >= b.len() {
        let factor = a.last().unwrap() / b.last().unwrap();
        let shift = a.len() - b.len();

        // the leading term cancels by construction; subtract the rest
        for (i, b_coeff) in b.iter().enumerate().take(b.len() - 1) {
            let t = &factor * b_coeff;
            a[shift + i] = &a[shift + i] - &t;
        }
        a.pop();
        trim(&mut a);
    }

    a
}

fn poly_gcd(mut a: Coeffs, mut b: Coeffs) -> Coeffs {
    while !b.is_empty() {
        let r = poly_rem(a, &b);
        a = b;
        b = r;
    }

    make_monic(&mut a);
    a
}

/// Returns the degree of gcd(f, x^N - 1), where f has the kernel's entries as its ascending
/// coefficients and N is the kernel's length. Degree 0 means the kernel's circulant operator
/// is invertible.
///
/// All kernel entries must be finite. Exactness: an f64 converts exactly to a dyadic rational,
/// and every nonzero kernel entry carries the same weight, so the root structure of f is
/// preserved no matter what the weight rounded to.
pub fn gcd_degree(kernel: &[f64]) -> usize {
    assert!(!kernel.is_empty());

    let n = kernel.len();
    let mut f: Coeffs = kernel.iter().map(|c| {
        assert!(c.is_finite());
        BigRational::from_float(*c).unwrap()
    }).collect();
    trim(&mut f);

    // the zero kernel shares all N roots
    if f.is_empty() {
        return n;
    }

    let mut g = vec![BigRational::zero(); n + 1];
    g[0] = BigRational::from_integer(BigInt::from(-1));
    g[n] = BigRational::from_integer(BigInt::from(1));

    let gcd = poly_gcd(f, g);
    gcd.len() - 1
}

pub fn is_invertible(kernel: &[f64]) -> bool {
    gcd_degree(kernel) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Determinant by Gaussian elimination with partial pivoting.
    fn determinant(mut m: Vec<Vec<f64>>) -> f64 {
        let n = m.len();
        let mut det = 1.0;
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|a, b| m[*a][col].abs().partial_cmp(&m[*b][col].abs()).unwrap())
                .unwrap();
            if m[pivot_row][col] == 0.0 {
                return 0.0;
            }
            if pivot_row != col {
                m.swap(pivot_row, col);
                det = -det;
            }
            det *= m[col][col];
            for row in col + 1..n {
                let factor = m[row][col] / m[col][col];
                for k in col..n {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }
        det
    }

    /// Circulant matrix with `kernel` as its first row, subsequent rows cyclically shifted.
    fn circulant(kernel: &[f64]) -> Vec<Vec<f64>> {
        let n = kernel.len();
        (0..n).map(|i| (0..n).map(|j| kernel[(n + j - i) % n]).collect()).collect()
    }

    #[test]
    fn given_identity_kernel_report_invertible() {
        assert_eq!(0, gcd_degree(&[1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn given_shifted_impulse_report_invertible() {
        assert!(is_invertible(&[0.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn given_opposed_tap_pair_report_singular() {
        // f(x) = (1 + x^2)/2 divides x^4 - 1
        assert_eq!(2, gcd_degree(&[0.5, 0.0, 0.5, 0.0]));
    }

    #[test]
    fn given_uniform_kernel_report_singular() {
        // f(x) = (1 + x + x^2 + x^3)/4 = (x^4 - 1) / (4 (x - 1))
        assert_eq!(3, gcd_degree(&[0.25; 4]));
    }

    #[test]
    fn given_zero_kernel_report_full_degree() {
        assert_eq!(6, gcd_degree(&[0.0; 6]));
    }

    #[test]
    fn given_non_power_of_2_length_check_still_works() {
        // (1 + x + x^2)/3 divides x^3 - 1, hence x^6 - 1
        assert_eq!(2, gcd_degree(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0, 0.0, 0.0]));
        // (1 + x^2)/2 has roots ±i, which are not 6th roots of unity
        assert!(is_invertible(&[0.5, 0.0, 0.5, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn verdict_matches_brute_force_circulant_determinant() {
        let kernels: Vec<Vec<f64>> = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.5, 0.0, 0.5, 0.0],
            vec![0.25; 4],
            vec![0.5, 0.25, 0.25, 0.0],
            vec![0.5, 0.5, 0.0, 0.0, 0.0, 0.0],
            vec![0.5, 0.0, 0.5, 0.0, 0.0, 0.0],
            vec![0.25, 0.25, 0.0, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0],
        ];

        for kernel in kernels {
            let det = determinant(circulant(&kernel));
            assert_eq!(
                det.abs() > 1.0e-9,
                is_invertible(&kernel),
                "kernel {:?}: det = {}", kernel, det
            );
        }
    }
}
