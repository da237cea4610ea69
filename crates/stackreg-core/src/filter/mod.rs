pub mod bandpass;

pub use bandpass::{build_bandpass_mask, SpatialFreqCutoff};
