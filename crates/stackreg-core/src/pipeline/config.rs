use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::channels::{ChannelSelection, ChannelSpec};
use crate::filter::SpatialFreqCutoff;

/// Inclusive, 0-based frame range treated as one independent block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRange {
    pub start: usize,
    pub end: usize,
}

impl TrialRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// How offsets are extended to block-edge frames that lie outside the
/// range where a full window fits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeExtension {
    /// Leading frames copy only the row offset of the first computed frame;
    /// trailing frames copy both components of the last computed frame.
    #[default]
    RowOnlyBefore,
    /// Leading and trailing frames copy both components.
    Symmetric,
}

impl std::fmt::Display for EdgeExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RowOnlyBefore => write!(f, "Row Only Before"),
            Self::Symmetric => write!(f, "Symmetric"),
        }
    }
}

/// What the frames are registered against.
#[derive(Clone, Debug, Default)]
pub enum ReferenceSpec {
    /// Windowed sum around the first computed frame of the first block.
    #[default]
    None,
    /// A full image with the stack's frame extent.
    Image(Array2<f64>),
    /// Windowed sum around the given frame.
    Frame(usize),
}

impl ReferenceSpec {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Everything `compute_stack_alignment` needs besides the stack.
#[derive(Clone, Debug)]
pub struct AlignmentOptions {
    pub channels: ChannelSpec,
    /// Register each frame against its predecessor and accumulate.
    pub progressive: bool,
    /// Sub-pixel resolution is `1 / upsampling` pixels.
    pub upsampling: usize,
    pub reference: ReferenceSpec,
    pub window_length: usize,
    pub cutoff: SpatialFreqCutoff,
    /// `None` treats the whole stack as one block.
    pub trials: Option<Vec<TrialRange>>,
    pub edge_extension: EdgeExtension,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            channels: ChannelSpec::default(),
            progressive: false,
            upsampling: 1,
            reference: ReferenceSpec::None,
            window_length: 1,
            cutoff: SpatialFreqCutoff::default(),
            trials: None,
            edge_extension: EdgeExtension::default(),
        }
    }
}

/// File-friendly alignment settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default)]
    pub channels: ChannelSelection,
    #[serde(default)]
    pub progressive: bool,
    #[serde(default = "default_upsampling")]
    pub upsampling: usize,
    #[serde(default)]
    pub reference_frame: Option<usize>,
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    #[serde(default)]
    pub cutoff: SpatialFreqCutoff,
    /// Empty means the whole stack is one block.
    #[serde(default)]
    pub trials: Vec<TrialRange>,
    #[serde(default)]
    pub edge_extension: EdgeExtension,
}

fn default_upsampling() -> usize {
    1
}

fn default_window_length() -> usize {
    1
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            channels: ChannelSelection::default(),
            progressive: false,
            upsampling: default_upsampling(),
            reference_frame: None,
            window_length: default_window_length(),
            cutoff: SpatialFreqCutoff::default(),
            trials: Vec::new(),
            edge_extension: EdgeExtension::default(),
        }
    }
}

impl From<&AlignmentConfig> for AlignmentOptions {
    fn from(config: &AlignmentConfig) -> Self {
        Self {
            channels: ChannelSpec::from(&config.channels),
            progressive: config.progressive,
            upsampling: config.upsampling,
            reference: config
                .reference_frame
                .map_or(ReferenceSpec::None, ReferenceSpec::Frame),
            window_length: config.window_length,
            cutoff: config.cutoff,
            trials: if config.trials.is_empty() {
                None
            } else {
                Some(config.trials.clone())
            },
            edge_extension: config.edge_extension,
        }
    }
}
