//! Binary band-pass masks over the unshifted 2D frequency grid.

use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackRegError};

/// Radial spatial-frequency band in cycles/pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialFreqCutoff {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub max: f64,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

fn is_unbounded(v: &f64) -> bool {
    v.is_infinite() && v.is_sign_positive()
}

impl Default for SpatialFreqCutoff {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

impl SpatialFreqCutoff {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(StackRegError::Configuration(
                "spatial frequency cutoff must not be NaN".into(),
            ));
        }
        if self.min < 0.0 || self.min > self.max {
            return Err(StackRegError::Configuration(format!(
                "spatial frequency cutoff requires 0 <= min <= max, got ({}, {})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// True when every frequency passes.
    pub fn is_all_pass(&self) -> bool {
        self.min <= 0.0 && self.max.is_infinite()
    }
}

/// Signed frequency of FFT bin `k` on an axis of length `n`, in cycles/pixel.
pub fn bin_frequency(k: usize, n: usize) -> f64 {
    if k <= (n - 1) / 2 {
        k as f64 / n as f64
    } else {
        (k as f64 - n as f64) / n as f64
    }
}

/// Build the `rows x cols` mask that keeps frequencies with radius in
/// `[cutoff.min, cutoff.max]`.
pub fn build_bandpass_mask(rows: usize, cols: usize, cutoff: &SpatialFreqCutoff) -> Array2<bool> {
    let mut mask = Array2::from_elem((rows, cols), false);
    for r in 0..rows {
        let fr = bin_frequency(r, rows);
        for c in 0..cols {
            let fc = bin_frequency(c, cols);
            let radius = (fr * fr + fc * fc).sqrt();
            if radius >= cutoff.min {
                mask[[r, c]] = true;
            }
            if radius > cutoff.max {
                mask[[r, c]] = false;
            }
        }
    }
    mask
}

/// Zero every spectrum bin outside the mask.
pub fn apply_mask(spectrum: &mut Array2<Complex<f64>>, mask: &Array2<bool>) {
    spectrum.zip_mut_with(mask, |v, &keep| {
        if !keep {
            *v = Complex::new(0.0, 0.0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_keeps_everything() {
        let mask = build_bandpass_mask(7, 8, &SpatialFreqCutoff::default());
        assert!(mask.iter().all(|&m| m));
    }

    #[test]
    fn min_above_zero_drops_dc() {
        let mask = build_bandpass_mask(8, 8, &SpatialFreqCutoff::new(0.1, f64::INFINITY));
        assert!(!mask[[0, 0]]);
        assert!(mask[[1, 0]]);
    }

    #[test]
    fn max_cuts_high_frequencies() {
        let mask = build_bandpass_mask(8, 8, &SpatialFreqCutoff::new(0.0, 0.2));
        assert!(mask[[0, 0]]);
        assert!(mask[[1, 1]]);
        // 0.5 cycles/pixel at the Nyquist bin
        assert!(!mask[[4, 0]]);
    }

    #[test]
    fn negative_frequencies_wrap() {
        assert_eq!(bin_frequency(7, 8), -0.125);
        assert_eq!(bin_frequency(4, 8), -0.5);
        assert_eq!(bin_frequency(3, 7), 3.0 / 7.0);
    }

    #[test]
    fn inverted_cutoff_is_rejected() {
        assert!(SpatialFreqCutoff::new(0.3, 0.1).validate().is_err());
    }
}
