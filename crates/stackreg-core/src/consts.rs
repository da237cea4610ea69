/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum number of trial blocks to register blocks in parallel.
pub const PARALLEL_TRIAL_THRESHOLD: usize = 2;

/// Side length (in original pixels) of the neighborhood evaluated by the
/// upsampled DFT refinement around the coarse peak.
pub const UPSAMPLED_SEARCH_WINDOW: f64 = 1.5;

/// Largest accepted upsampling factor; the refinement grid is
/// `ceil(1.5 * U)` samples per axis.
pub const MAX_UPSAMPLING: usize = 10_000;

/// Relative tolerance under which two correlation magnitudes count as tied.
pub const PEAK_TIE_TOLERANCE: f64 = 1e-12;

/// Energy below which a spectrum is treated as empty.
pub const ENERGY_EPSILON: f64 = 1e-300;

/// Number of channels produced when loading a colour image (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;
