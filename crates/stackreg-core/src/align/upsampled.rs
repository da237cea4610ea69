//! Localized upsampled cross-correlation via matrix-multiply DFT
//! (Guizar-Sicairos, Thurman & Fienup, Optics Letters 33(2), 2008).
//!
//! Instead of zero-padding the whole spectrum by the upsampling factor, the
//! inverse DFT is evaluated only on a small `size x size` grid of positions
//! spaced `1/upsample` pixels apart.

use std::f64::consts::TAU;

use ndarray::Array2;
use num_complex::Complex;

use crate::filter::bandpass::bin_frequency;

/// Kernel of shape `(n, size)` with entry `(k, j) = exp(i 2π f_k x_j)`, where
/// `f_k` is the signed frequency of bin `k` and `x_j = origin + j / upsample`.
fn build_dft_kernel(n: usize, size: usize, origin: f64, upsample: f64) -> Array2<Complex<f64>> {
    Array2::from_shape_fn((n, size), |(k, j)| {
        let pos = origin + j as f64 / upsample;
        Complex::from_polar(1.0, TAU * bin_frequency(k, n) * pos)
    })
}

/// Evaluate the (unnormalized) inverse DFT of `cross_power` on a
/// `size x size` grid whose first sample sits at `(row_origin, col_origin)`.
pub(super) fn upsampled_correlation(
    cross_power: &Array2<Complex<f64>>,
    size: usize,
    upsample: f64,
    row_origin: f64,
    col_origin: f64,
) -> Array2<Complex<f64>> {
    let (h, w) = cross_power.dim();
    let row_kernel = build_dft_kernel(h, size, row_origin, upsample);
    let col_kernel = build_dft_kernel(w, size, col_origin, upsample);

    // (size, h) x (h, w) x (w, size)
    row_kernel.t().dot(cross_power).dot(&col_kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ifft2d_complex;

    #[test]
    fn integer_grid_matches_inverse_fft() {
        let cross = Array2::from_shape_fn((6, 8), |(r, c)| {
            Complex::new((r as f64 * 0.7).sin() + c as f64, (c as f64 * 0.3).cos())
        });
        let dense = ifft2d_complex(&cross);
        let n = (6 * 8) as f64;
        let up = upsampled_correlation(&cross, 3, 1.0, 2.0, 4.0);
        for j in 0..3 {
            for i in 0..3 {
                let expected = dense[[2 + j, 4 + i]] * n;
                assert!((up[[j, i]] - expected).norm() < 1e-9);
            }
        }
    }
}
