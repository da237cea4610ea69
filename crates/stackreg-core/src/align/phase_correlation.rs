//! Translation estimation by frequency-domain cross-correlation.
//!
//! Two stages:
//! 1. **Coarse**: inverse FFT of the cross-power spectrum, integer-pixel peak.
//! 2. **Fine** (upsample > 1): matrix-multiply DFT on a `ceil(1.5 * U)` square
//!    grid around the coarse peak, giving ~`1/U` pixel precision.
//!
//! The cross-power spectrum is not normalized to unit magnitude, so the
//! surface is the plain cross-correlation of the two (filtered) images.

use ndarray::Array2;
use num_complex::Complex;
use tracing::trace;

use crate::compute::{fft2d_forward, ifft2d_complex};
use crate::consts::{ENERGY_EPSILON, MAX_UPSAMPLING, PEAK_TIE_TOLERANCE, UPSAMPLED_SEARCH_WINDOW};
use crate::error::{Result, StackRegError};
use crate::frame::{FrameOffset, Registration};

use super::upsampled::upsampled_correlation;

/// Estimate the offset of `target` relative to `reference` from their spectra.
///
/// If `target(r, c) = reference(r - dr, c - dc)` the returned offset is
/// `(dr, dc)`; shifting the target by the negated offset realigns it.
pub fn register_spectra(
    reference: &Array2<Complex<f64>>,
    target: &Array2<Complex<f64>>,
    upsample: usize,
) -> Result<Registration> {
    let (h, w) = reference.dim();
    if target.dim() != (h, w) {
        return Err(StackRegError::ShapeMismatch {
            expected: vec![h, w],
            actual: vec![target.nrows(), target.ncols()],
        });
    }
    check_upsampling(upsample)?;

    let ref_energy: f64 = reference.iter().map(|v| v.norm_sqr()).sum();
    let tgt_energy: f64 = target.iter().map(|v| v.norm_sqr()).sum();
    let norm = (ref_energy * tgt_energy).sqrt();
    if !norm.is_finite() || norm < ENERGY_EPSILON {
        trace!("Zero-energy spectrum, reporting zero offset");
        return Ok(Registration::default());
    }

    let cross_power = cross_power_spectrum(reference, target);

    // Stage 1: integer-pixel peak of the correlation surface.
    let correlation = ifft2d_complex(&cross_power);
    let coarse = find_peak(h, w, |r, c| correlation[[r, c]].norm(), |r, c| {
        (wrap_index(r, h), wrap_index(c, w))
    });
    let (peak_row, peak_col) = (wrap_index(coarse.row, h), wrap_index(coarse.col, w));

    if upsample == 1 {
        return Ok(Registration {
            offset: FrameOffset::new(-peak_row, -peak_col),
            strength: (coarse.magnitude * (h * w) as f64 / norm).min(1.0),
        });
    }

    // Stage 2: upsampled DFT around the coarse peak.
    let factor = upsample as f64;
    let size = (UPSAMPLED_SEARCH_WINDOW * factor).ceil() as usize;
    let center = (size / 2) as f64;
    let row_origin = peak_row - center / factor;
    let col_origin = peak_col - center / factor;

    let fine_surface = upsampled_correlation(&cross_power, size, factor, row_origin, col_origin);
    let fine = find_peak(size, size, |r, c| fine_surface[[r, c]].norm(), |r, c| {
        (
            row_origin + r as f64 / factor,
            col_origin + c as f64 / factor,
        )
    });

    let row = row_origin + fine.row as f64 / factor;
    let col = col_origin + fine.col as f64 / factor;
    Ok(Registration {
        offset: FrameOffset::new(-row, -col),
        strength: (fine.magnitude / norm).min(1.0),
    })
}

/// Reject upsampling factors outside `1..=MAX_UPSAMPLING`.
pub fn check_upsampling(upsample: usize) -> Result<()> {
    if upsample == 0 || upsample > MAX_UPSAMPLING {
        return Err(StackRegError::Configuration(format!(
            "upsampling factor must be in 1..={MAX_UPSAMPLING}, got {upsample}"
        )));
    }
    Ok(())
}

/// Register two spatial-domain images without filtering.
pub fn register_images(
    reference: &Array2<f64>,
    target: &Array2<f64>,
    upsample: usize,
) -> Result<Registration> {
    if reference.dim() != target.dim() {
        return Err(StackRegError::ShapeMismatch {
            expected: vec![reference.nrows(), reference.ncols()],
            actual: vec![target.nrows(), target.ncols()],
        });
    }
    register_spectra(&fft2d_forward(reference), &fft2d_forward(target), upsample)
}

/// `reference * conj(target)`, element-wise.
pub fn cross_power_spectrum(
    reference: &Array2<Complex<f64>>,
    target: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut cross = reference.clone();
    cross.zip_mut_with(target, |a, b| *a *= b.conj());
    cross
}

/// Signed displacement of FFT index `i` on an axis of length `n`.
fn wrap_index(i: usize, n: usize) -> f64 {
    if i > n / 2 {
        i as f64 - n as f64
    } else {
        i as f64
    }
}

#[derive(Clone, Copy, Debug)]
struct Peak {
    row: usize,
    col: usize,
    magnitude: f64,
    distance: f64,
}

/// Scan a `rows x cols` surface for its maximum magnitude. Ties within
/// `PEAK_TIE_TOLERANCE` go to the candidate closest to zero displacement
/// (L1), then to the first one scanned.
fn find_peak<M, D>(rows: usize, cols: usize, magnitude: M, displacement: D) -> Peak
where
    M: Fn(usize, usize) -> f64,
    D: Fn(usize, usize) -> (f64, f64),
{
    let mut best = Peak {
        row: 0,
        col: 0,
        magnitude: f64::NEG_INFINITY,
        distance: f64::INFINITY,
    };

    for r in 0..rows {
        for c in 0..cols {
            let mag = magnitude(r, c);
            if mag.is_nan() {
                continue;
            }
            let (dr, dc) = displacement(r, c);
            let candidate = Peak {
                row: r,
                col: c,
                magnitude: mag,
                distance: dr.abs() + dc.abs(),
            };
            if beats(&candidate, &best) {
                best = candidate;
            }
        }
    }

    if best.magnitude == f64::NEG_INFINITY {
        best.magnitude = 0.0;
    }
    best
}

fn beats(candidate: &Peak, best: &Peak) -> bool {
    if best.magnitude == f64::NEG_INFINITY {
        return true;
    }
    let tolerance = PEAK_TIE_TOLERANCE * best.magnitude.abs();
    if candidate.magnitude > best.magnitude + tolerance {
        true
    } else if (candidate.magnitude - best.magnitude).abs() <= tolerance {
        candidate.distance < best.distance
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_index_maps_upper_half_to_negative() {
        assert_eq!(wrap_index(0, 8), 0.0);
        assert_eq!(wrap_index(4, 8), 4.0);
        assert_eq!(wrap_index(5, 8), -3.0);
        assert_eq!(wrap_index(6, 7), -1.0);
    }

    #[test]
    fn exact_tie_prefers_smallest_displacement() {
        let surface = [[1.0, 0.5, 1.0], [0.2, 1.0, 0.1], [0.0, 0.0, 0.0]];
        let peak = find_peak(3, 3, |r, c| surface[r][c], |r, c| {
            (r as f64 - 1.0, c as f64 - 1.0)
        });
        assert_eq!((peak.row, peak.col), (1, 1));
    }

    #[test]
    fn flat_surface_picks_zero_shift() {
        let peak = find_peak(4, 4, |_, _| 0.0, |r, c| (wrap_index(r, 4), wrap_index(c, 4)));
        assert_eq!((peak.row, peak.col), (0, 0));
    }

    #[test]
    fn zero_energy_reports_zero_offset() {
        let zeros = Array2::<Complex<f64>>::zeros((4, 4));
        let reg = register_spectra(&zeros, &zeros, 10).unwrap();
        assert_eq!(reg.offset, FrameOffset::default());
        assert_eq!(reg.strength, 0.0);
    }

    #[test]
    fn upsampling_bounds() {
        assert!(check_upsampling(1).is_ok());
        assert!(check_upsampling(MAX_UPSAMPLING).is_ok());
        assert!(matches!(check_upsampling(0), Err(StackRegError::Configuration(_))));
        assert!(matches!(
            check_upsampling(MAX_UPSAMPLING + 1),
            Err(StackRegError::Configuration(_))
        ));
    }
}
