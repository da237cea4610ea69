use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, Axis};
use num_complex::Complex;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::align::{check_upsampling, register_spectra};
use crate::channels::ChannelSpec;
use crate::compute::fft2d_forward;
use crate::consts::PARALLEL_TRIAL_THRESHOLD;
use crate::error::{Result, StackRegError};
use crate::filter::bandpass::{apply_mask, build_bandpass_mask};
use crate::frame::{fill_missing, FrameOffset, FrameOffsets, MaskedImage, Registration};
use crate::source::{ImageStack, NormalizationMode, NormalizationOverride, StackDims};
use crate::window::{FrameWindow, WindowSpec};

use super::accumulate::accumulate_offsets;
use super::config::{AlignmentOptions, ReferenceSpec};
use super::trials::{plan_blocks, BlockPlan};
use super::types::{AlignmentStage, NoOpReporter, ProgressReporter};

/// Compute per-frame translation offsets for every frame of `stack`.
///
/// Returns an `F x 2` matrix of `[row, col]` shifts. The stack's
/// normalization mode is switched off for the duration of the call and
/// restored afterwards, whether or not the call succeeds.
pub fn compute_stack_alignment<S: ImageStack + ?Sized>(
    stack: &mut S,
    options: &AlignmentOptions,
) -> Result<FrameOffsets> {
    compute_stack_alignment_reported(stack, options, &NoOpReporter)
}

/// [`compute_stack_alignment`] with progress reporting and cancellation.
pub fn compute_stack_alignment_reported<S: ImageStack + ?Sized>(
    stack: &mut S,
    options: &AlignmentOptions,
    reporter: &dyn ProgressReporter,
) -> Result<FrameOffsets> {
    let dims = stack.dims();
    let (window, blocks) = validate(&dims, options)?;

    info!(
        frames = dims.frames,
        rows = dims.rows,
        cols = dims.cols,
        blocks = blocks.len(),
        window = window.length,
        upsampling = options.upsampling,
        progressive = options.progressive,
        "Computing stack alignment"
    );

    let guard = NormalizationOverride::new(stack, NormalizationMode::None);
    let engine = Engine {
        stack: &*guard,
        channels: &options.channels,
        window,
        mask: (!options.cutoff.is_all_pass())
            .then(|| build_bandpass_mask(dims.rows, dims.cols, &options.cutoff)),
        upsampling: options.upsampling,
    };

    let fixed_reference = if options.progressive {
        None
    } else {
        reporter.begin_stage(AlignmentStage::ResolvingReference, None);
        let spectrum = engine.reference_spectrum(&options.reference, &blocks[0])?;
        reporter.finish_stage();
        Some(spectrum)
    };

    let total_inner: usize = blocks.iter().map(BlockPlan::inner_len).sum();
    reporter.begin_stage(AlignmentStage::Registering, Some(total_inner));
    let progress = Progress {
        reporter,
        done: AtomicUsize::new(0),
    };

    let per_block: Vec<Vec<FrameOffset>> = match &fixed_reference {
        Some(reference) if blocks.len() >= PARALLEL_TRIAL_THRESHOLD => blocks
            .par_iter()
            .map(|plan| {
                let mut state = ReferenceState::Fixed(reference);
                engine.register_block(plan, &mut state, &progress)
            })
            .collect::<Result<_>>()?,
        _ => {
            let mut state = match &fixed_reference {
                Some(reference) => ReferenceState::Fixed(reference),
                None => ReferenceState::Rolling(None),
            };
            blocks
                .iter()
                .map(|plan| engine.register_block(plan, &mut state, &progress))
                .collect::<Result<_>>()?
        }
    };
    reporter.finish_stage();

    let mut offsets = FrameOffsets::zeros(dims.frames);
    for (plan, block_offsets) in blocks.iter().zip(per_block) {
        for (frame, offset) in plan.inner_frames().zip(block_offsets) {
            offsets.set(frame, offset);
        }
        plan.extend_edges(&mut offsets, options.edge_extension);
    }

    if options.progressive {
        reporter.begin_stage(AlignmentStage::Accumulating, Some(dims.frames));
        offsets = accumulate_offsets(&offsets);
        reporter.finish_stage();
    }

    drop(guard);
    info!(frames = offsets.len(), "Stack alignment complete");
    Ok(offsets)
}

/// Pre-flight checks; nothing is read from the stack until these pass.
fn validate(dims: &StackDims, options: &AlignmentOptions) -> Result<(WindowSpec, Vec<BlockPlan>)> {
    if options.progressive && !options.reference.is_none() {
        return Err(StackRegError::Configuration(
            "a reference cannot be combined with progressive registration".into(),
        ));
    }
    if dims.frames == 0 || dims.rows == 0 || dims.cols == 0 {
        return Err(StackRegError::EmptyStack);
    }
    if let ReferenceSpec::Image(image) = &options.reference {
        if image.dim() != (dims.rows, dims.cols) {
            return Err(StackRegError::SizeMismatch {
                expected_rows: dims.rows,
                expected_cols: dims.cols,
                rows: image.nrows(),
                cols: image.ncols(),
            });
        }
    }
    check_upsampling(options.upsampling)?;
    options.cutoff.validate()?;
    let window = WindowSpec::new(options.window_length)?;

    let channels = options.channels.channels();
    if channels.is_empty() {
        return Err(StackRegError::Configuration(
            "at least one channel must be selected".into(),
        ));
    }
    for &channel in channels {
        dims.check_channel(channel)?;
    }

    let blocks = plan_blocks(dims.frames, options.trials.as_deref(), window)?;

    // The reference window must fit in the stack as well.
    if let ReferenceSpec::Frame(frame) = options.reference {
        let past_end = frame
            .checked_add(window.ahead())
            .map_or(true, |last| last >= dims.frames);
        if frame < window.behind() || past_end {
            return Err(StackRegError::FrameOutOfBounds {
                index: frame,
                total: dims.frames,
            });
        }
    }

    Ok((window, blocks))
}

struct Progress<'a> {
    reporter: &'a dyn ProgressReporter,
    done: AtomicUsize,
}

impl Progress<'_> {
    fn check_cancelled(&self) -> Result<()> {
        if self.reporter.is_cancelled() {
            return Err(StackRegError::Cancelled);
        }
        Ok(())
    }

    fn frame_done(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.reporter.advance(done);
    }
}

enum ReferenceState<'r> {
    /// One spectrum shared by every frame of every block.
    Fixed(&'r Array2<Complex<f64>>),
    /// Spectrum of the previously registered frame.
    Rolling(Option<Array2<Complex<f64>>>),
}

impl ReferenceState<'_> {
    fn register(&mut self, spectrum: Array2<Complex<f64>>, upsampling: usize) -> Result<Registration> {
        match self {
            Self::Fixed(reference) => register_spectra(reference, &spectrum, upsampling),
            Self::Rolling(previous) => {
                let registration = match previous.as_ref() {
                    Some(reference) => register_spectra(reference, &spectrum, upsampling)?,
                    None => Registration {
                        offset: FrameOffset::default(),
                        strength: 1.0,
                    },
                };
                *previous = Some(spectrum);
                Ok(registration)
            }
        }
    }
}

struct Engine<'a, S: ImageStack + ?Sized> {
    stack: &'a S,
    channels: &'a ChannelSpec,
    window: WindowSpec,
    mask: Option<Array2<bool>>,
    upsampling: usize,
}

impl<S: ImageStack + ?Sized> Engine<'_, S> {
    /// Read and combine frames, one masked image per requested frame.
    fn read_combined(&self, frames: &[usize]) -> Result<Vec<MaskedImage>> {
        let slab = self.stack.read(frames, self.channels.channels())?;
        let combined = self.channels.combine(slab.view())?;
        Ok(combined
            .axis_iter(Axis(2))
            .map(|frame| frame.to_owned())
            .collect())
    }

    fn window_frames(&self, frame: usize) -> Result<Vec<usize>> {
        let total = self.stack.dims().frames;
        self.window
            .frames_around(frame)
            .filter(|frames| frames.last().is_some_and(|&last| last < total))
            .ok_or(StackRegError::FrameOutOfBounds { index: frame, total })
    }

    fn window_sum_at(&self, frame: usize) -> Result<MaskedImage> {
        let frames = self.window_frames(frame)?;
        Ok(FrameWindow::initialize(self.read_combined(&frames)?)?.current_sum())
    }

    fn spectrum(&self, image: &Array2<f64>) -> Array2<Complex<f64>> {
        let mut spectrum = fft2d_forward(image);
        if let Some(mask) = &self.mask {
            apply_mask(&mut spectrum, mask);
        }
        spectrum
    }

    fn reference_spectrum(
        &self,
        reference: &ReferenceSpec,
        first_block: &BlockPlan,
    ) -> Result<Array2<Complex<f64>>> {
        let image = match reference {
            ReferenceSpec::None => {
                debug!(frame = first_block.inner_start, "Reference from first block window");
                fill_missing(&self.window_sum_at(first_block.inner_start)?)
            }
            ReferenceSpec::Frame(frame) => {
                debug!(frame, "Reference from frame window");
                fill_missing(&self.window_sum_at(*frame)?)
            }
            ReferenceSpec::Image(image) => {
                debug!("Reference from supplied image");
                image.mapv(|v| if v.is_finite() { v } else { 0.0 })
            }
        };
        Ok(self.spectrum(&image))
    }

    /// Register every inner frame of one block, in order.
    fn register_block(
        &self,
        plan: &BlockPlan,
        reference: &mut ReferenceState<'_>,
        progress: &Progress<'_>,
    ) -> Result<Vec<FrameOffset>> {
        debug!(
            start = plan.block.start,
            end = plan.block.end,
            inner_start = plan.inner_start,
            inner_end = plan.inner_end,
            "Registering block"
        );

        let first = plan.inner_start;
        let mut window = FrameWindow::initialize(self.read_combined(&self.window_frames(first)?)?)?;
        let mut offsets = Vec::with_capacity(plan.inner_len());

        for frame in plan.inner_frames() {
            progress.check_cancelled()?;

            let sum = if frame == first {
                window.current_sum()
            } else {
                let incoming = frame + self.window.ahead();
                let newest = self
                    .read_combined(&[incoming])?
                    .pop()
                    .ok_or(StackRegError::EmptyStack)?;
                window.advance(newest)?
            };

            let registration = reference.register(self.spectrum(&fill_missing(&sum)), self.upsampling)?;
            trace!(
                frame,
                row = registration.offset.row,
                col = registration.offset.col,
                strength = registration.strength,
                "Registered frame"
            );
            offsets.push(registration.offset);
            progress.frame_done();
        }

        Ok(offsets)
    }
}
