use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::{Result, StackRegError};
use crate::source::ArrayStack;

/// Decode an image into per-channel planes with values in [0.0, 1.0].
/// Grayscale images yield one plane, colour images three (R, G, B).
fn decode_channels(img: &DynamicImage) -> Vec<Array2<f32>> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if img.color().has_color() {
        let rgb = img.to_rgb16();
        (0..COLOR_CHANNEL_COUNT)
            .map(|ch| {
                Array2::from_shape_fn((h, w), |(row, col)| {
                    rgb.get_pixel(col as u32, row as u32).0[ch] as f32 / 65535.0
                })
            })
            .collect()
    } else {
        let gray = img.to_luma16();
        vec![Array2::from_shape_fn((h, w), |(row, col)| {
            gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
        })]
    }
}

/// Load a grayscale image file (colour is converted to luminance).
pub fn load_image(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    }))
}

/// Load image files as consecutive frames of one stack.
///
/// Every file must have the same dimensions and channel count.
pub fn load_stack(paths: &[PathBuf]) -> Result<ArrayStack> {
    if paths.is_empty() {
        return Err(StackRegError::EmptyStack);
    }
    debug!(files = paths.len(), "Decoding stack frames");

    let frames: Vec<Vec<Array2<f32>>> = paths
        .par_iter()
        .map(|path| -> Result<Vec<Array2<f32>>> { Ok(decode_channels(&image::open(path)?)) })
        .collect::<Result<_>>()?;

    ArrayStack::from_channel_frames(&frames)
}

/// Save a frame as 16-bit grayscale TIFF.
pub fn save_tiff(frame: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let pixels: Vec<u16> = frame
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| StackRegError::ShapeMismatch {
            expected: vec![h, w],
            actual: vec![frame.len()],
        })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG.
pub fn save_png(frame: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), v) in frame.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([(v.clamp(0.0, 1.0) * 255.0) as u8]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save frame, choosing format from file extension.
pub fn save_image(frame: &Array2<f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(frame, path),
        _ => save_tiff(frame, path),
    }
}
