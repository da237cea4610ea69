pub mod phase_correlation;
pub mod shift;
mod upsampled;

pub use phase_correlation::{check_upsampling, register_images, register_spectra};
pub use shift::{fourier_shift, realign_frame};
