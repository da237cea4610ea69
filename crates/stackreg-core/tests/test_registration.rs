mod common;

use approx::assert_relative_eq;
use ndarray::Array2;

use stackreg_core::align::{fourier_shift, realign_frame, register_images, register_spectra};
use stackreg_core::compute::fft2d_forward;
use stackreg_core::filter::bandpass::apply_mask;
use stackreg_core::filter::{build_bandpass_mask, SpatialFreqCutoff};
use stackreg_core::{FrameOffset, StackRegError};

use common::{roll, textured_image, to_f32};

#[test]
fn identical_images_register_at_zero_with_full_strength() {
    let img = textured_image(48, 48, 1);
    for upsample in [1, 4, 10] {
        let reg = register_images(&img, &img, upsample).unwrap();
        assert_eq!(reg.offset.row.abs(), 0.0);
        assert_eq!(reg.offset.col.abs(), 0.0);
        assert_relative_eq!(reg.strength, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn integer_shift_is_exact_without_upsampling() {
    let base = textured_image(64, 64, 2);
    for &(dr, dc) in &[(3i64, -5i64), (-7, 2), (0, 11), (20, -20)] {
        let moved = roll(&base, dr, dc);
        let reg = register_images(&base, &moved, 1).unwrap();
        assert_eq!(reg.offset, FrameOffset::new(dr as f64, dc as f64));
    }
}

#[test]
fn fractional_shift_recovered_within_one_upsampled_step() {
    let base = textured_image(64, 64, 3);
    let truth = FrameOffset::new(2.3, -1.7);
    let moved = fourier_shift(&base, truth);

    let reg = register_images(&base, &moved, 10).unwrap();
    assert!((reg.offset.row - truth.row).abs() <= 0.1, "row {}", reg.offset.row);
    assert!((reg.offset.col - truth.col).abs() <= 0.1, "col {}", reg.offset.col);
}

#[test]
fn finer_upsampling_tightens_estimate() {
    let base = textured_image(64, 64, 4);
    let truth = FrameOffset::new(-0.45, 0.8);
    let moved = fourier_shift(&base, truth);

    let reg = register_images(&base, &moved, 20).unwrap();
    assert!((reg.offset.row - truth.row).abs() <= 0.05);
    assert!((reg.offset.col - truth.col).abs() <= 0.05);
}

#[test]
fn strength_is_scale_invariant_and_bounded() {
    let base = textured_image(32, 32, 5);
    let moved = roll(&base, 1, 2).mapv(|v| v * 7.5);
    let reg = register_images(&base, &moved, 4).unwrap();
    assert_eq!(reg.offset, FrameOffset::new(1.0, 2.0));
    assert!(reg.strength > 0.0 && reg.strength <= 1.0);

    let other = textured_image(32, 32, 99);
    let unrelated = register_images(&base, &other, 4).unwrap();
    assert!(unrelated.strength <= 1.0);
    assert!(unrelated.strength < reg.strength);
}

#[test]
fn zero_target_reports_no_motion() {
    let base = textured_image(16, 16, 6);
    let zeros = Array2::<f64>::zeros((16, 16));
    let reg = register_images(&base, &zeros, 10).unwrap();
    assert_eq!(reg.offset, FrameOffset::default());
    assert_eq!(reg.strength, 0.0);
}

#[test]
fn mismatched_shapes_are_rejected() {
    let a = textured_image(16, 16, 7);
    let b = textured_image(16, 18, 7);
    assert!(matches!(
        register_images(&a, &b, 1),
        Err(StackRegError::ShapeMismatch { .. })
    ));
}

#[test]
fn bandpassed_spectra_still_register() {
    let base = textured_image(64, 64, 8);
    let moved = roll(&base, -4, 6);
    let mask = build_bandpass_mask(64, 64, &SpatialFreqCutoff::new(0.02, 0.3));

    let mut a = fft2d_forward(&base);
    let mut b = fft2d_forward(&moved);
    apply_mask(&mut a, &mask);
    apply_mask(&mut b, &mask);

    let reg = register_spectra(&a, &b, 1).unwrap();
    assert_eq!(reg.offset, FrameOffset::new(-4.0, 6.0));
}

#[test]
fn realign_frame_undoes_measured_offset() {
    let base = textured_image(32, 32, 9);
    let offset = FrameOffset::new(1.5, -2.25);
    let moved = to_f32(&fourier_shift(&base, offset));

    let restored = realign_frame(&moved, offset);
    for (a, b) in restored.iter().zip(to_f32(&base).iter()) {
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
fn oversized_upsampling_is_rejected() {
    let img = textured_image(16, 16, 10);
    assert!(matches!(
        register_images(&img, &img, usize::MAX / 2),
        Err(StackRegError::Configuration(_))
    ));
}
