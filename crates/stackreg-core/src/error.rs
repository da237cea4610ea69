use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackRegError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Reference size mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    SizeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameOutOfBounds { index: usize, total: usize },

    #[error("Channel index {index} out of range (total: {total})")]
    ChannelOutOfBounds { index: usize, total: usize },

    #[error("Invalid trial range {start}..={end}: {reason}")]
    InvalidTrial {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Empty image stack")]
    EmptyStack,

    #[error("Alignment cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, StackRegError>;
