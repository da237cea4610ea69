pub mod align;
pub mod channels;
pub mod compute;
pub mod consts;
pub mod error;
pub mod filter;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod source;
pub mod window;

pub use error::{Result, StackRegError};
pub use frame::{FrameOffset, FrameOffsets};
pub use pipeline::{compute_stack_alignment, AlignmentOptions};
