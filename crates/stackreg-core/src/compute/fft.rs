//! Separable 2D FFTs over `ndarray` images, built on `rustfft`.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex;
use num_traits::Zero;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// 2D forward FFT of a real image: row-wise FFT, then column-wise FFT.
pub fn fft2d_forward(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));
    transform_rows(&mut result, &fft_row);
    transform_cols(&mut result, &fft_col);
    result
}

/// 2D inverse FFT normalized by `1/(h*w)`, keeping the complex result.
pub fn ifft2d_complex(data: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    transform_cols(&mut work, &ifft_col);
    transform_rows(&mut work, &ifft_row);

    let scale = 1.0 / (h * w) as f64;
    work.mapv_inplace(|v| v * scale);
    work
}

/// 2D inverse FFT, returning the real part normalized by `1/(h*w)`.
pub fn ifft2d_inverse(data: &Array2<Complex<f64>>) -> Array2<f64> {
    ifft2d_complex(data).mapv(|v| v.re)
}

fn transform_rows(work: &mut Array2<Complex<f64>>, fft: &Arc<dyn Fft<f64>>) {
    let (h, w) = work.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let processed: Vec<Vec<Complex<f64>>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut row_data: Vec<Complex<f64>> = work.row(row).to_vec();
                fft.process(&mut row_data);
                row_data
            })
            .collect();
        for (row, row_data) in processed.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                work[[row, col]] = val;
            }
        }
    } else {
        let mut row_data = vec![Complex::zero(); w];
        for row in 0..h {
            for (dst, src) in row_data.iter_mut().zip(work.row(row)) {
                *dst = *src;
            }
            fft.process(&mut row_data);
            for (col, val) in row_data.iter().enumerate() {
                work[[row, col]] = *val;
            }
        }
    }
}

fn transform_cols(work: &mut Array2<Complex<f64>>, fft: &Arc<dyn Fft<f64>>) {
    let (h, w) = work.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let processed: Vec<Vec<Complex<f64>>> = (0..w)
            .into_par_iter()
            .map(|col| {
                let mut col_data: Vec<Complex<f64>> = work.column(col).to_vec();
                fft.process(&mut col_data);
                col_data
            })
            .collect();
        for (col, col_data) in processed.into_iter().enumerate() {
            for (row, val) in col_data.into_iter().enumerate() {
                work[[row, col]] = val;
            }
        }
    } else {
        let mut col_data = vec![Complex::zero(); h];
        for col in 0..w {
            for (dst, src) in col_data.iter_mut().zip(work.column(col)) {
                *dst = *src;
            }
            fft.process(&mut col_data);
            for (row, val) in col_data.iter().enumerate() {
                work[[row, col]] = *val;
            }
        }
    }
}
