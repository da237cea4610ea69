//! Sub-pixel translation of images in the frequency domain.

use std::f64::consts::TAU;

use ndarray::Array2;
use num_complex::Complex;

use crate::compute::{fft2d_forward, ifft2d_inverse};
use crate::filter::bandpass::bin_frequency;
use crate::frame::FrameOffset;

/// Circularly translate `image` by `offset` (rows, cols) using the Fourier
/// shift theorem: `out(r, c) = image(r - offset.row, c - offset.col)`.
pub fn fourier_shift(image: &Array2<f64>, offset: FrameOffset) -> Array2<f64> {
    let (h, w) = image.dim();
    let mut spectrum = fft2d_forward(image);
    for ((r, c), v) in spectrum.indexed_iter_mut() {
        let phase = -TAU * (bin_frequency(r, h) * offset.row + bin_frequency(c, w) * offset.col);
        *v *= Complex::from_polar(1.0, phase);
    }
    ifft2d_inverse(&spectrum)
}

/// Undo a measured frame offset, bringing the frame back onto the reference.
pub fn realign_frame(frame: &Array2<f32>, offset: FrameOffset) -> Array2<f32> {
    let data = frame.mapv(f64::from);
    let inverse = FrameOffset::new(-offset.row, -offset.col);
    fourier_shift(&data, inverse).mapv(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_shift_is_circular_roll() {
        let image = Array2::from_shape_fn((5, 6), |(r, c)| (r * 6 + c) as f64);
        let shifted = fourier_shift(&image, FrameOffset::new(1.0, -2.0));
        for r in 0..5 {
            for c in 0..6 {
                let src = image[[(r + 4) % 5, (c + 2) % 6]];
                assert!((shifted[[r, c]] - src).abs() < 1e-9);
            }
        }
    }
}
