//! Reduction of multi-channel frames to a single registration image.

use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array3, ArrayView4, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackRegError};
use crate::frame::masked_add;

/// Custom channel reduction: `[rows, cols, frames, channels]` in,
/// `[rows, cols, frames]` out.
pub trait ChannelReducer: Send + Sync {
    fn reduce(&self, slab: ArrayView4<'_, Option<f32>>) -> Array3<Option<f64>>;
}

impl<F> ChannelReducer for F
where
    F: Fn(ArrayView4<'_, Option<f32>>) -> Array3<Option<f64>> + Send + Sync,
{
    fn reduce(&self, slab: ArrayView4<'_, Option<f32>>) -> Array3<Option<f64>> {
        self(slab)
    }
}

/// Which channels feed the registration image, and how they are combined.
#[derive(Clone)]
pub enum ChannelSpec {
    /// One channel, passed through unchanged.
    Single(usize),
    /// Sum over the listed channels, ignoring missing samples.
    Summed(Vec<usize>),
    /// Caller-supplied reducer over the listed channels.
    Custom {
        channels: Vec<usize>,
        reducer: Arc<dyn ChannelReducer>,
    },
}

impl ChannelSpec {
    pub fn custom<R: ChannelReducer + 'static>(channels: Vec<usize>, reducer: R) -> Self {
        Self::Custom {
            channels,
            reducer: Arc::new(reducer),
        }
    }

    /// Channel indices to read from the stack, in slab order.
    pub fn channels(&self) -> &[usize] {
        match self {
            Self::Single(c) => std::slice::from_ref(c),
            Self::Summed(cs) => cs,
            Self::Custom { channels, .. } => channels,
        }
    }

    /// Combine a slab read with [`ChannelSpec::channels`] into one image per frame.
    pub fn combine(&self, slab: ArrayView4<'_, Option<f32>>) -> Result<Array3<Option<f64>>> {
        let (rows, cols, frames, _) = slab.dim();
        let combined = match self {
            Self::Single(_) => slab
                .index_axis(Axis(3), 0)
                .mapv(|v| v.map(f64::from)),
            Self::Summed(_) => {
                let mut acc = Array3::<Option<f64>>::from_elem((rows, cols, frames), None);
                for channel in slab.axis_iter(Axis(3)) {
                    acc.zip_mut_with(&channel, |a, &v| *a = masked_add(*a, v.map(f64::from)));
                }
                acc
            }
            Self::Custom { reducer, .. } => reducer.reduce(slab),
        };

        if combined.dim() != (rows, cols, frames) {
            let (r, c, f) = combined.dim();
            return Err(StackRegError::ShapeMismatch {
                expected: vec![rows, cols, frames],
                actual: vec![r, c, f],
            });
        }
        Ok(combined)
    }
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self::Single(0)
    }
}

impl fmt::Debug for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(c) => f.debug_tuple("Single").field(c).finish(),
            Self::Summed(cs) => f.debug_tuple("Summed").field(cs).finish(),
            Self::Custom { channels, .. } => f
                .debug_struct("Custom")
                .field("channels", channels)
                .finish_non_exhaustive(),
        }
    }
}

/// Serializable subset of [`ChannelSpec`], used by configuration files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelection {
    Single(usize),
    Summed(Vec<usize>),
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self::Single(0)
    }
}

impl From<&ChannelSelection> for ChannelSpec {
    fn from(sel: &ChannelSelection) -> Self {
        match sel {
            ChannelSelection::Single(c) => ChannelSpec::Single(*c),
            ChannelSelection::Summed(cs) if cs.len() == 1 => ChannelSpec::Single(cs[0]),
            ChannelSelection::Summed(cs) => ChannelSpec::Summed(cs.clone()),
        }
    }
}

/// Mean over channels ignoring missing samples; a ready-made custom reducer.
pub fn mean_channels(slab: ArrayView4<'_, Option<f32>>) -> Array3<Option<f64>> {
    let (rows, cols, frames, _) = slab.dim();
    let mut out = Array3::<Option<f64>>::from_elem((rows, cols, frames), None);
    for r in 0..rows {
        for c in 0..cols {
            for f in 0..frames {
                let samples = slab.slice(s![r, c, f, ..]);
                let (sum, n) = samples
                    .iter()
                    .flatten()
                    .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
                if n > 0 {
                    out[[r, c, f]] = Some(sum / n as f64);
                }
            }
        }
    }
    out
}
