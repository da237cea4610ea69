//! Image stack data sources.
//!
//! The registration engine only reads from a stack through [`ImageStack`]:
//! rectangular sub-volumes covering the full frame extent, restricted to a
//! subset of frames and channels.

mod array_stack;
mod normalization;

pub use array_stack::ArrayStack;
pub use normalization::NormalizationOverride;

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackRegError};

/// Extent of a stack: `(rows, cols, frames, channels)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackDims {
    pub rows: usize,
    pub cols: usize,
    pub frames: usize,
    pub channels: usize,
}

impl StackDims {
    pub fn check_frame(&self, index: usize) -> Result<()> {
        if index >= self.frames {
            return Err(StackRegError::FrameOutOfBounds {
                index,
                total: self.frames,
            });
        }
        Ok(())
    }

    pub fn check_channel(&self, index: usize) -> Result<()> {
        if index >= self.channels {
            return Err(StackRegError::ChannelOutOfBounds {
                index,
                total: self.channels,
            });
        }
        Ok(())
    }
}

/// How a stack scales channel samples before handing them out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMode {
    /// Raw samples.
    #[default]
    None,
    /// Each channel divided by its maximum over the whole stack.
    ChannelMax,
}

impl std::fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::ChannelMax => write!(f, "Channel Max"),
        }
    }
}

/// A 4D image stack `[rows, cols, frames, channels]` owned outside the engine.
pub trait ImageStack: Sync {
    fn dims(&self) -> StackDims;

    /// Read all pixels of the given frames and channels.
    ///
    /// The result has shape `(rows, cols, frames.len(), channels.len())`,
    /// ordered as requested. Missing samples are `None`.
    fn read(&self, frames: &[usize], channels: &[usize]) -> Result<Array4<Option<f32>>>;

    fn normalization(&self) -> NormalizationMode;

    fn set_normalization(&mut self, mode: NormalizationMode);
}
