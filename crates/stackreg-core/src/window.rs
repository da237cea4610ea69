//! Rolling window over the most recent combined frames.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackRegError};
use crate::frame::{masked_add, MaskedImage};

/// Length of the frame averaging window.
///
/// A window of length `L` covers the frame offsets
/// `-floor((L-1)/2) ..= floor(L/2)` around the current frame, so odd lengths
/// are centred and even lengths lean forward by one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub length: usize,
}

impl WindowSpec {
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(StackRegError::Configuration(
                "window length must be at least 1".into(),
            ));
        }
        Ok(Self { length })
    }

    /// Frames the window reaches back from the current one.
    pub fn behind(&self) -> usize {
        (self.length - 1) / 2
    }

    /// Frames the window reaches ahead of the current one.
    pub fn ahead(&self) -> usize {
        self.length / 2
    }

    /// Frame indices covered by the window around `frame`, oldest first.
    /// `None` if the window would start before frame 0 or end past
    /// `usize::MAX`.
    pub fn frames_around(&self, frame: usize) -> Option<Vec<usize>> {
        let first = frame.checked_sub(self.behind())?;
        let last = frame.checked_add(self.ahead())?;
        Some((first..=last).collect())
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self { length: 1 }
    }
}

/// Ring buffer of the last `L` combined frames with an O(1) running sum.
///
/// Missing samples are ignored; a pixel that is missing in every slot stays
/// missing in the sum.
pub struct FrameWindow {
    slots: Vec<MaskedImage>,
    sum: Array2<f64>,
    valid: Array2<u32>,
    next: usize,
    since_rebuild: usize,
}

impl FrameWindow {
    /// Fill every slot from the first window, oldest frame first.
    pub fn initialize(frames: Vec<MaskedImage>) -> Result<Self> {
        let first = frames.first().ok_or(StackRegError::EmptyStack)?;
        let shape = first.dim();
        if let Some(bad) = frames.iter().find(|f| f.dim() != shape) {
            return Err(StackRegError::ShapeMismatch {
                expected: vec![shape.0, shape.1],
                actual: vec![bad.nrows(), bad.ncols()],
            });
        }

        let mut window = Self {
            slots: frames,
            sum: Array2::zeros(shape),
            valid: Array2::zeros(shape),
            next: 0,
            since_rebuild: 0,
        };
        window.rebuild();
        Ok(window)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replace the oldest frame with `frame` and return the new sum.
    pub fn advance(&mut self, frame: MaskedImage) -> Result<MaskedImage> {
        if frame.dim() != self.sum.dim() {
            return Err(StackRegError::ShapeMismatch {
                expected: vec![self.sum.nrows(), self.sum.ncols()],
                actual: vec![frame.nrows(), frame.ncols()],
            });
        }

        let slot = self.next;
        let evicted = std::mem::replace(&mut self.slots[slot], frame);
        self.next = (slot + 1) % self.slots.len();
        self.since_rebuild += 1;

        if self.since_rebuild >= self.slots.len() {
            self.rebuild();
        } else {
            Zip::from(&mut self.sum)
                .and(&mut self.valid)
                .and(&evicted)
                .and(&self.slots[slot])
                .for_each(|s, n, &old, &new| {
                    if let Some(v) = old {
                        *s -= v;
                        *n -= 1;
                    }
                    if let Some(v) = new {
                        *s += v;
                        *n += 1;
                    }
                });
        }
        Ok(self.current_sum())
    }

    /// Sum of the frames currently held.
    pub fn current_sum(&self) -> MaskedImage {
        let mut out = MaskedImage::from_elem(self.sum.dim(), None);
        Zip::from(&mut out)
            .and(&self.sum)
            .and(&self.valid)
            .for_each(|o, &s, &n| *o = if n > 0 { Some(s) } else { None });
        out
    }

    /// Recompute the running sum exactly from the slots.
    fn rebuild(&mut self) {
        let mut acc = MaskedImage::from_elem(self.sum.dim(), None);
        self.valid.fill(0);
        for slot in &self.slots {
            acc.zip_mut_with(slot, |a, &v| *a = masked_add(*a, v));
            self.valid.zip_mut_with(slot, |n, v| {
                if v.is_some() {
                    *n += 1;
                }
            });
        }
        self.sum = acc.mapv(|v| v.unwrap_or(0.0));
        self.since_rebuild = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(v: f64) -> MaskedImage {
        MaskedImage::from_elem((2, 2), Some(v))
    }

    #[test]
    fn window_offsets() {
        let w = WindowSpec::new(5).unwrap();
        assert_eq!((w.behind(), w.ahead()), (2, 2));
        let w = WindowSpec::new(4).unwrap();
        assert_eq!((w.behind(), w.ahead()), (1, 2));
        assert_eq!(w.frames_around(1), Some(vec![0, 1, 2, 3]));
        assert_eq!(w.frames_around(0), None);
        assert_eq!(w.frames_around(usize::MAX), None);
    }

    #[test]
    fn advance_replaces_oldest() {
        let mut w = FrameWindow::initialize(vec![img(1.0), img(2.0), img(3.0)]).unwrap();
        assert_eq!(w.current_sum()[[0, 0]], Some(6.0));
        assert_eq!(w.advance(img(10.0)).unwrap()[[0, 0]], Some(15.0));
        assert_eq!(w.advance(img(20.0)).unwrap()[[0, 0]], Some(33.0));
        assert_eq!(w.advance(img(30.0)).unwrap()[[1, 1]], Some(60.0));
        assert_eq!(w.advance(img(0.0)).unwrap()[[1, 1]], Some(50.0));
    }

    #[test]
    fn missing_samples_are_ignored_until_all_missing() {
        let mut hole = img(4.0);
        hole[[0, 1]] = None;
        let mut w = FrameWindow::initialize(vec![img(1.0), hole.clone()]).unwrap();
        assert_eq!(w.current_sum()[[0, 1]], Some(1.0));
        let sum = w.advance(hole).unwrap();
        assert_eq!(sum[[0, 1]], None);
        assert_eq!(sum[[0, 0]], Some(8.0));
    }

    #[test]
    fn single_slot_window_tracks_latest_frame() {
        let mut w = FrameWindow::initialize(vec![img(1.0)]).unwrap();
        assert_eq!(w.advance(img(7.0)).unwrap()[[0, 0]], Some(7.0));
        assert_eq!(w.len(), 1);
    }
}
