#![allow(dead_code)]

use std::sync::Mutex;

use ndarray::{Array2, Array4};

use stackreg_core::source::{ArrayStack, ImageStack, NormalizationMode, StackDims};
use stackreg_core::Result;

/// Deterministic textured test image: a field of Gaussian blobs placed by a
/// small LCG so every seed gives a different, repeatable pattern. Blobs wrap
/// around the borders so the image is smooth when tiled periodically.
pub fn textured_image(h: usize, w: usize, seed: u64) -> Array2<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let mut img = Array2::<f64>::zeros((h, w));
    let sigma = 2.5;
    for _ in 0..40 {
        let cy = next() * h as f64;
        let cx = next() * w as f64;
        let amp = 0.3 + 0.7 * next();
        for r in 0..h {
            for c in 0..w {
                let dy = wrapped(r as f64 - cy, h as f64);
                let dx = wrapped(c as f64 - cx, w as f64);
                img[[r, c]] += amp * (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp();
            }
        }
    }
    img
}

fn wrapped(d: f64, n: f64) -> f64 {
    d - n * (d / n).round()
}

/// Circularly roll an image so that `out(r, c) = img(r - dr, c - dc)`.
pub fn roll(img: &Array2<f64>, dr: i64, dc: i64) -> Array2<f64> {
    let (h, w) = img.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let sr = (r as i64 - dr).rem_euclid(h as i64) as usize;
        let sc = (c as i64 - dc).rem_euclid(w as i64) as usize;
        img[[sr, sc]]
    })
}

pub fn to_f32(img: &Array2<f64>) -> Array2<f32> {
    img.mapv(|v| v as f32)
}

pub fn stack_of(frames: &[Array2<f64>]) -> ArrayStack {
    let frames: Vec<Array2<f32>> = frames.iter().map(to_f32).collect();
    ArrayStack::from_frames(&frames).expect("build stack")
}

/// Stack wrapper that records every read request and the normalization mode
/// in effect when it was made.
pub struct RecordingStack {
    pub inner: ArrayStack,
    pub reads: Mutex<Vec<(Vec<usize>, NormalizationMode)>>,
}

impl RecordingStack {
    pub fn new(inner: ArrayStack) -> Self {
        Self {
            inner,
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<(Vec<usize>, NormalizationMode)> {
        self.reads.lock().unwrap().clone()
    }
}

impl ImageStack for RecordingStack {
    fn dims(&self) -> StackDims {
        self.inner.dims()
    }

    fn read(&self, frames: &[usize], channels: &[usize]) -> Result<Array4<Option<f32>>> {
        self.reads
            .lock()
            .unwrap()
            .push((frames.to_vec(), self.inner.normalization()));
        self.inner.read(frames, channels)
    }

    fn normalization(&self) -> NormalizationMode {
        self.inner.normalization()
    }

    fn set_normalization(&mut self, mode: NormalizationMode) {
        self.inner.set_normalization(mode);
    }
}
