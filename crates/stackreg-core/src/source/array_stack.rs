use ndarray::{s, Array2, Array4, Axis, Zip};

use crate::error::{Result, StackRegError};

use super::{ImageStack, NormalizationMode, StackDims};

/// In-memory image stack backed by an `Array4` of shape
/// `(rows, cols, frames, channels)`.
#[derive(Clone, Debug)]
pub struct ArrayStack {
    data: Array4<Option<f32>>,
    channel_max: Vec<f32>,
    mode: NormalizationMode,
}

impl ArrayStack {
    pub fn new(data: Array4<Option<f32>>) -> Result<Self> {
        let (rows, cols, frames, channels) = data.dim();
        if frames == 0 || channels == 0 || rows == 0 || cols == 0 {
            return Err(StackRegError::EmptyStack);
        }
        let channel_max = data
            .axis_iter(Axis(3))
            .map(|channel| {
                channel
                    .iter()
                    .flatten()
                    .fold(f32::NEG_INFINITY, |m, &v| m.max(v))
            })
            .collect();
        Ok(Self {
            data,
            channel_max,
            mode: NormalizationMode::None,
        })
    }

    /// Single-channel stack from a sequence of equally sized frames.
    /// NaN pixels become missing samples.
    pub fn from_frames(frames: &[Array2<f32>]) -> Result<Self> {
        let channels: Vec<Vec<Array2<f32>>> = frames.iter().map(|f| vec![f.clone()]).collect();
        Self::from_channel_frames(&channels)
    }

    /// Multi-channel stack; `frames[f][c]` is channel `c` of frame `f`.
    pub fn from_channel_frames(frames: &[Vec<Array2<f32>>]) -> Result<Self> {
        let first = frames
            .first()
            .and_then(|f| f.first())
            .ok_or(StackRegError::EmptyStack)?;
        let (rows, cols) = first.dim();
        let channels = frames[0].len();

        let mut data = Array4::<Option<f32>>::from_elem((rows, cols, frames.len(), channels), None);
        for (fi, frame) in frames.iter().enumerate() {
            if frame.len() != channels {
                return Err(StackRegError::ShapeMismatch {
                    expected: vec![channels],
                    actual: vec![frame.len()],
                });
            }
            for (ci, plane) in frame.iter().enumerate() {
                if plane.dim() != (rows, cols) {
                    return Err(StackRegError::ShapeMismatch {
                        expected: vec![rows, cols],
                        actual: vec![plane.nrows(), plane.ncols()],
                    });
                }
                Zip::from(data.slice_mut(s![.., .., fi, ci]))
                    .and(plane)
                    .for_each(|d, &v| *d = if v.is_nan() { None } else { Some(v) });
            }
        }
        Self::new(data)
    }

    pub fn with_normalization(mut self, mode: NormalizationMode) -> Self {
        self.mode = mode;
        self
    }

    fn scale(&self, channel: usize) -> f32 {
        match self.mode {
            NormalizationMode::None => 1.0,
            NormalizationMode::ChannelMax => {
                let max = self.channel_max[channel];
                if max.is_finite() && max > 0.0 {
                    1.0 / max
                } else {
                    1.0
                }
            }
        }
    }
}

impl ImageStack for ArrayStack {
    fn dims(&self) -> StackDims {
        let (rows, cols, frames, channels) = self.data.dim();
        StackDims {
            rows,
            cols,
            frames,
            channels,
        }
    }

    fn read(&self, frames: &[usize], channels: &[usize]) -> Result<Array4<Option<f32>>> {
        let dims = self.dims();
        for &f in frames {
            dims.check_frame(f)?;
        }
        for &c in channels {
            dims.check_channel(c)?;
        }

        let mut out = Array4::<Option<f32>>::from_elem(
            (dims.rows, dims.cols, frames.len(), channels.len()),
            None,
        );
        for (fi, &f) in frames.iter().enumerate() {
            for (ci, &c) in channels.iter().enumerate() {
                let scale = self.scale(c);
                Zip::from(out.slice_mut(s![.., .., fi, ci]))
                    .and(self.data.slice(s![.., .., f, c]))
                    .for_each(|o, &v| *o = v.map(|x| x * scale));
            }
        }
        Ok(out)
    }

    fn normalization(&self) -> NormalizationMode {
        self.mode
    }

    fn set_normalization(&mut self, mode: NormalizationMode) {
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_orders_frames_and_channels_as_requested() {
        let a = Array2::from_elem((2, 3), 1.0f32);
        let b = Array2::from_elem((2, 3), 2.0f32);
        let stack = ArrayStack::from_channel_frames(&[vec![a.clone(), b.clone()], vec![b, a]])
            .unwrap();
        let block = stack.read(&[1, 0], &[1]).unwrap();
        assert_eq!(block.dim(), (2, 3, 2, 1));
        assert_eq!(block[[0, 0, 0, 0]], Some(1.0));
        assert_eq!(block[[0, 0, 1, 0]], Some(2.0));
    }

    #[test]
    fn nan_becomes_missing() {
        let mut a = Array2::from_elem((2, 2), 1.0f32);
        a[[1, 1]] = f32::NAN;
        let stack = ArrayStack::from_frames(&[a]).unwrap();
        let block = stack.read(&[0], &[0]).unwrap();
        assert_eq!(block[[1, 1, 0, 0]], None);
        assert_eq!(block[[0, 1, 0, 0]], Some(1.0));
    }

    #[test]
    fn channel_max_normalization_scales_reads() {
        let a = Array2::from_elem((2, 2), 4.0f32);
        let stack = ArrayStack::from_frames(&[a])
            .unwrap()
            .with_normalization(NormalizationMode::ChannelMax);
        let block = stack.read(&[0], &[0]).unwrap();
        assert_eq!(block[[0, 0, 0, 0]], Some(1.0));
    }

    #[test]
    fn out_of_range_frame_is_rejected() {
        let stack = ArrayStack::from_frames(&[Array2::zeros((2, 2))]).unwrap();
        assert!(matches!(
            stack.read(&[1], &[0]),
            Err(StackRegError::FrameOutOfBounds { index: 1, total: 1 })
        ));
    }
}
