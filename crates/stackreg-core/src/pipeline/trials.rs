//! Trial block validation and per-block frame planning.

use crate::error::{Result, StackRegError};
use crate::frame::FrameOffsets;
use crate::window::WindowSpec;

use super::config::{EdgeExtension, TrialRange};

/// A validated trial block and the frames in it whose full window fits
/// inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPlan {
    pub block: TrialRange,
    pub inner_start: usize,
    pub inner_end: usize,
}

impl BlockPlan {
    pub fn inner_frames(&self) -> std::ops::RangeInclusive<usize> {
        self.inner_start..=self.inner_end
    }

    pub fn inner_len(&self) -> usize {
        self.inner_end + 1 - self.inner_start
    }

    /// Copy the computed offsets of the first and last inner frames onto the
    /// block-edge frames outside the inner range.
    pub fn extend_edges(&self, offsets: &mut FrameOffsets, policy: EdgeExtension) {
        let first = offsets.get(self.inner_start);
        for frame in self.block.start..self.inner_start {
            match policy {
                EdgeExtension::RowOnlyBefore => offsets.set_row(frame, first.row),
                EdgeExtension::Symmetric => offsets.set(frame, first),
            }
        }

        let last = offsets.get(self.inner_end);
        for frame in self.inner_end + 1..=self.block.end {
            offsets.set(frame, last);
        }
    }
}

/// Validate trial ranges against the stack length and window, returning one
/// plan per block. `None` means a single block spanning every frame.
pub fn plan_blocks(
    total_frames: usize,
    trials: Option<&[TrialRange]>,
    window: WindowSpec,
) -> Result<Vec<BlockPlan>> {
    if total_frames == 0 {
        return Err(StackRegError::EmptyStack);
    }
    let whole = [TrialRange::new(0, total_frames - 1)];
    let trials = trials.unwrap_or(&whole);
    if trials.is_empty() {
        return Err(StackRegError::Configuration(
            "at least one trial range is required".into(),
        ));
    }

    let mut plans = Vec::with_capacity(trials.len());
    let mut previous_end: Option<usize> = None;
    for trial in trials {
        if trial.is_empty() {
            return Err(invalid(trial, "start is after end"));
        }
        if trial.end >= total_frames {
            return Err(StackRegError::FrameOutOfBounds {
                index: trial.end,
                total: total_frames,
            });
        }
        if previous_end.is_some_and(|end| trial.start <= end) {
            return Err(invalid(trial, "overlaps or precedes the previous block"));
        }
        if trial.len() < window.length {
            return Err(invalid(
                trial,
                &format!("shorter than the window length {}", window.length),
            ));
        }

        plans.push(BlockPlan {
            block: *trial,
            inner_start: trial.start + window.behind(),
            inner_end: trial.end - window.ahead(),
        });
        previous_end = Some(trial.end);
    }
    Ok(plans)
}

fn invalid(trial: &TrialRange, reason: &str) -> StackRegError {
    StackRegError::InvalidTrial {
        start: trial.start,
        end: trial.end,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameOffset;

    fn window(len: usize) -> WindowSpec {
        WindowSpec::new(len).unwrap()
    }

    #[test]
    fn whole_stack_is_default_block() {
        let plans = plan_blocks(10, None, window(5)).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!((plans[0].inner_start, plans[0].inner_end), (2, 7));
    }

    #[test]
    fn even_window_leans_forward() {
        let plans = plan_blocks(10, None, window(4)).unwrap();
        assert_eq!((plans[0].inner_start, plans[0].inner_end), (1, 7));
    }

    #[test]
    fn block_shorter_than_window_is_rejected() {
        let trials = [TrialRange::new(0, 2)];
        assert!(matches!(
            plan_blocks(10, Some(&trials), window(5)),
            Err(StackRegError::InvalidTrial { .. })
        ));
    }

    #[test]
    fn overlapping_blocks_are_rejected() {
        let trials = [TrialRange::new(0, 4), TrialRange::new(4, 8)];
        assert!(plan_blocks(10, Some(&trials), window(1)).is_err());
    }

    #[test]
    fn block_past_stack_end_is_rejected() {
        let trials = [TrialRange::new(0, 10)];
        assert!(matches!(
            plan_blocks(10, Some(&trials), window(1)),
            Err(StackRegError::FrameOutOfBounds { index: 10, total: 10 })
        ));
    }

    #[test]
    fn edges_follow_policy() {
        let plan = plan_blocks(6, None, window(3)).unwrap()[0];
        let mut offsets = FrameOffsets::zeros(6);
        for f in plan.inner_frames() {
            offsets.set(f, FrameOffset::new(f as f64, -(f as f64)));
        }

        let mut legacy = offsets.clone();
        plan.extend_edges(&mut legacy, EdgeExtension::RowOnlyBefore);
        assert_eq!(legacy.get(0), FrameOffset::new(1.0, 0.0));
        assert_eq!(legacy.get(5), FrameOffset::new(4.0, -4.0));

        plan.extend_edges(&mut offsets, EdgeExtension::Symmetric);
        assert_eq!(offsets.get(0), FrameOffset::new(1.0, -1.0));
    }
}
